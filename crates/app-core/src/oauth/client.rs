use std::time::Duration;

use async_trait::async_trait;
use oauth2::AccessToken;
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, redirect};
use serde::Deserialize;

use super::{OAuthError, ProviderConfig, UserProfile};

/// Outbound calls made during the callback: the code-for-token exchange and
/// the user-info fetch.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Exchanges an authorization code for an access token.
    async fn exchange_code(
        &self,
        provider: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, OAuthError>;

    /// Fetches the user's profile from the provider and normalizes it.
    async fn fetch_profile(&self, provider: &ProviderConfig, token: &AccessToken) -> Result<UserProfile, OAuthError>;
}

#[derive(Deserialize)]
struct TokenBody {
    access_token: String,
}

/// [`OAuthClient`] over a shared `reqwest` client. No retries; every call is
/// bounded by the client timeout.
#[derive(Debug, Clone)]
pub struct HttpOAuthClient {
    http: Client,
}

impl HttpOAuthClient {
    pub fn new(timeout: Duration) -> Result<Self, OAuthError> {
        let http = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {:?}", e);
                OAuthError::HttpClient(e)
            })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    async fn exchange_code(
        &self,
        provider: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&provider.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(OAuthError::TokenExchange(format!("status {status}: {body}")));
        }

        let token: TokenBody = serde_json::from_str(&body)
            .map_err(|_| OAuthError::TokenExchange(format!("malformed token response: {body}")))?;

        if token.access_token.is_empty() {
            return Err(OAuthError::TokenExchange(format!("empty access token: {body}")));
        }

        Ok(AccessToken::new(token.access_token))
    }

    async fn fetch_profile(&self, provider: &ProviderConfig, token: &AccessToken) -> Result<UserProfile, OAuthError> {
        let response = self
            .http
            .get(&provider.userinfo_url)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetch(format!("user info request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::ProfileFetch(format!("failed to read user info response: {e}")))?;

        if !status.is_success() {
            return Err(OAuthError::ProfileFetch(format!("status {status}: {body}")));
        }

        UserProfile::normalize(provider.provider, &body)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::oauth::Provider;

    fn provider_config(server: &MockServer, provider: Provider) -> ProviderConfig {
        ProviderConfig {
            provider,
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            authorize_url: server.url("/authorize"),
            token_url: server.url("/token"),
            userinfo_url: server.url("/userinfo"),
            scopes: vec!["openid".to_string()],
        }
    }

    fn client() -> HttpOAuthClient {
        HttpOAuthClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .x_www_form_urlencoded_tuple("grant_type", "authorization_code")
                    .x_www_form_urlencoded_tuple("code", "the-code")
                    .x_www_form_urlencoded_tuple("redirect_uri", "https://app.example.com/auth/google/callback")
                    .x_www_form_urlencoded_tuple("client_id", "client-id")
                    .x_www_form_urlencoded_tuple("client_secret", "client-secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "access_token": "provider-token", "token_type": "Bearer", "expires_in": 3599 }));
            })
            .await;

        let token = client()
            .exchange_code(
                &provider_config(&server, Provider::Google),
                "the-code",
                "https://app.example.com/auth/google/callback",
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token.secret(), "provider-token");
    }

    #[tokio::test]
    async fn test_exchange_code_linkedin_without_token_type() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({ "access_token": "li-token", "expires_in": 5184000 }));
            })
            .await;

        let token = client()
            .exchange_code(&provider_config(&server, Provider::LinkedIn), "code", "https://app/cb")
            .await
            .unwrap();

        assert_eq!(token.secret(), "li-token");
    }

    #[tokio::test]
    async fn test_exchange_code_unauthorized_keeps_provider_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(401).json_body(json!({ "error": "invalid_client" }));
            })
            .await;

        let err = client()
            .exchange_code(&provider_config(&server, Provider::Google), "code", "https://app/cb")
            .await
            .unwrap_err();

        let OAuthError::TokenExchange(detail) = err else {
            panic!("expected token exchange error, got {err:?}");
        };
        assert!(detail.contains("401"));
        assert!(detail.contains("invalid_client"));
    }

    #[tokio::test]
    async fn test_exchange_code_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).body("not json");
            })
            .await;

        let result = client()
            .exchange_code(&provider_config(&server, Provider::Facebook), "code", "https://app/cb")
            .await;

        assert!(matches!(result, Err(OAuthError::TokenExchange(_))));
    }

    #[tokio::test]
    async fn test_exchange_code_unreachable_endpoint() {
        let mut config = provider_config(&MockServer::start_async().await, Provider::Google);
        config.token_url = "http://127.0.0.1:1/token".to_string();

        let result = client().exchange_code(&config, "code", "https://app/cb").await;

        assert!(matches!(result, Err(OAuthError::TokenExchange(_))));
    }

    #[tokio::test]
    async fn test_fetch_profile_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo").header("authorization", "Bearer provider-token");
                then.status(200).json_body(json!({
                    "id": "10158",
                    "name": "John Smith",
                    "email": "john@example.com",
                    "picture": { "data": { "url": "https://fb.example/p.jpg" } }
                }));
            })
            .await;

        let profile = client()
            .fetch_profile(
                &provider_config(&server, Provider::Facebook),
                &AccessToken::new("provider-token".to_string()),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(profile.id, "10158");
        assert_eq!(profile.email.as_deref(), Some("john@example.com"));
        assert_eq!(profile.picture.as_deref(), Some("https://fb.example/p.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_profile_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo");
                then.status(500).body("boom");
            })
            .await;

        let result = client()
            .fetch_profile(&provider_config(&server, Provider::Google), &AccessToken::new("t".to_string()))
            .await;

        assert!(matches!(result, Err(OAuthError::ProfileFetch(detail)) if detail.contains("boom")));
    }

    #[tokio::test]
    async fn test_fetch_profile_empty_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo");
                then.status(200).body("");
            })
            .await;

        let result = client()
            .fetch_profile(&provider_config(&server, Provider::LinkedIn), &AccessToken::new("t".to_string()))
            .await;

        assert!(matches!(result, Err(OAuthError::ProfileFetch(_))));
    }
}
