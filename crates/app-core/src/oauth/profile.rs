//! Provider-agnostic user profile and the per-provider mappings into it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{OAuthError, Provider};

/// A user's identity as reported by a provider. Fields the provider did not
/// return are left out rather than filled with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub provider: Provider,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl UserProfile {
    /// Maps a raw user-info body into a profile using the shape `provider`
    /// is known to return.
    pub fn normalize(provider: Provider, body: &str) -> Result<Self, OAuthError> {
        if body.trim().is_empty() {
            return Err(OAuthError::ProfileFetch("empty user info response".to_string()));
        }

        let profile = match provider {
            Provider::Google => serde_json::from_str::<GoogleUserInfo>(body).map(Self::from_google),
            Provider::Facebook => serde_json::from_str::<FacebookUserInfo>(body).map(Self::from_facebook),
            Provider::LinkedIn => serde_json::from_str::<LinkedInUserInfo>(body).map(Self::from_linkedin),
        }
        .map_err(|e| OAuthError::ProfileFetch(format!("malformed {provider} user info: {e}")))?;

        if profile.id.is_empty() {
            return Err(OAuthError::ProfileFetch(format!("{provider} user info has no user id")));
        }

        Ok(profile)
    }

    fn from_google(info: GoogleUserInfo) -> Self {
        Self {
            provider: Provider::Google,
            id: info.id.or(info.sub).map(id_to_string).unwrap_or_default(),
            name: non_empty(info.name),
            email: non_empty(info.email),
            picture: non_empty(info.picture),
        }
    }

    fn from_facebook(info: FacebookUserInfo) -> Self {
        Self {
            provider: Provider::Facebook,
            id: info.id.map(id_to_string).unwrap_or_default(),
            name: non_empty(info.name),
            email: non_empty(info.email),
            picture: non_empty(info.picture.and_then(|p| p.data).and_then(|d| d.url)),
        }
    }

    fn from_linkedin(info: LinkedInUserInfo) -> Self {
        let name = non_empty(info.name).or_else(|| {
            let joined = [info.given_name, info.family_name]
                .into_iter()
                .flatten()
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            non_empty(Some(joined))
        });

        Self {
            provider: Provider::LinkedIn,
            id: info.sub.map(id_to_string).unwrap_or_default(),
            name,
            email: non_empty(info.email),
            picture: non_empty(info.picture),
        }
    }
}

// Google v1 userinfo uses `id`; the OpenID Connect endpoint uses `sub`.
#[derive(Deserialize)]
struct GoogleUserInfo {
    id: Option<Value>,
    sub: Option<Value>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

#[derive(Deserialize)]
struct FacebookUserInfo {
    id: Option<Value>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<FacebookPicture>,
}

#[derive(Deserialize)]
struct FacebookPicture {
    data: Option<FacebookPictureData>,
}

#[derive(Deserialize)]
struct FacebookPictureData {
    url: Option<String>,
}

#[derive(Deserialize)]
struct LinkedInUserInfo {
    sub: Option<Value>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

fn id_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_google() {
        let body = json!({
            "id": "1234567890",
            "email": "jane@example.com",
            "verified_email": true,
            "name": "Jane Doe",
            "given_name": "Jane",
            "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
            "locale": "en"
        })
        .to_string();

        let profile = UserProfile::normalize(Provider::Google, &body).unwrap();

        assert_eq!(profile, UserProfile {
            provider: Provider::Google,
            id: "1234567890".to_string(),
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            picture: Some("https://lh3.googleusercontent.com/a/photo.jpg".to_string()),
        });
    }

    #[test]
    fn test_normalize_google_openid_sub() {
        let body = json!({ "sub": "109", "email": "a@b.c" }).to_string();

        let profile = UserProfile::normalize(Provider::Google, &body).unwrap();

        assert_eq!(profile.id, "109");
        assert_eq!(profile.name, None);
        assert_eq!(profile.picture, None);
    }

    #[test]
    fn test_normalize_facebook_flattens_picture() {
        let body = json!({
            "id": "10158",
            "name": "John Smith",
            "picture": { "data": { "height": 50, "is_silhouette": false, "url": "https://fb.example/p.jpg", "width": 50 } }
        })
        .to_string();

        let profile = UserProfile::normalize(Provider::Facebook, &body).unwrap();

        assert_eq!(profile.id, "10158");
        assert_eq!(profile.name.as_deref(), Some("John Smith"));
        assert_eq!(profile.email, None);
        assert_eq!(profile.picture.as_deref(), Some("https://fb.example/p.jpg"));
    }

    #[test]
    fn test_normalize_facebook_numeric_id() {
        let body = json!({ "id": 42, "name": "N" }).to_string();

        assert_eq!(UserProfile::normalize(Provider::Facebook, &body).unwrap().id, "42");
    }

    #[test]
    fn test_normalize_linkedin() {
        let body = json!({
            "sub": "782bbtaQ",
            "name": "John Doe",
            "given_name": "John",
            "family_name": "Doe",
            "picture": "https://media.licdn.com/photo.jpg",
            "locale": "en-US",
            "email": "doe@email.com",
            "email_verified": true
        })
        .to_string();

        let profile = UserProfile::normalize(Provider::LinkedIn, &body).unwrap();

        assert_eq!(profile.provider, Provider::LinkedIn);
        assert_eq!(profile.id, "782bbtaQ");
        assert_eq!(profile.name.as_deref(), Some("John Doe"));
        assert_eq!(profile.email.as_deref(), Some("doe@email.com"));
        assert_eq!(profile.picture.as_deref(), Some("https://media.licdn.com/photo.jpg"));
    }

    #[test]
    fn test_normalize_linkedin_name_from_parts() {
        let body = json!({ "sub": "abc", "given_name": "Ada", "family_name": "Lovelace" }).to_string();

        let profile = UserProfile::normalize(Provider::LinkedIn, &body).unwrap();

        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_normalize_rejects_empty_body() {
        for provider in Provider::ALL {
            assert!(matches!(UserProfile::normalize(provider, "  "), Err(OAuthError::ProfileFetch(_))));
        }
    }

    #[test]
    fn test_normalize_rejects_missing_id() {
        let body = json!({ "name": "No Id" }).to_string();

        for provider in Provider::ALL {
            assert!(matches!(UserProfile::normalize(provider, &body), Err(OAuthError::ProfileFetch(_))));
        }
    }

    #[test]
    fn test_normalize_rejects_non_json() {
        assert!(matches!(
            UserProfile::normalize(Provider::Google, "<html>oops</html>"),
            Err(OAuthError::ProfileFetch(_))
        ));
    }

    #[test]
    fn test_serialized_profile_omits_absent_fields() {
        let profile = UserProfile {
            provider: Provider::Facebook,
            id: "1".to_string(),
            name: Some("A".to_string()),
            email: None,
            picture: None,
        };

        let value = serde_json::to_value(&profile).unwrap();

        assert_eq!(value, json!({ "provider": "facebook", "id": "1", "name": "A" }));
    }
}
