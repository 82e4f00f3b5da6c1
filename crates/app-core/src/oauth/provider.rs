use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OAuthError;

/// The identity providers this service can delegate login to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
    LinkedIn,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::Facebook, Provider::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::LinkedIn => "linkedin",
        }
    }

    pub(crate) fn default_endpoints(&self) -> Endpoints {
        match self {
            Provider::Google => Endpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                userinfo_url: "https://www.googleapis.com/oauth2/v1/userinfo",
                scopes: "openid email profile",
            },
            Provider::Facebook => Endpoints {
                authorize_url: "https://www.facebook.com/dialog/oauth",
                token_url: "https://graph.facebook.com/oauth/access_token",
                userinfo_url: "https://graph.facebook.com/v12.0/me?fields=id,name,email,picture",
                scopes: "email public_profile",
            },
            Provider::LinkedIn => Endpoints {
                authorize_url: "https://www.linkedin.com/oauth/v2/authorization",
                token_url: "https://www.linkedin.com/oauth/v2/accessToken",
                userinfo_url: "https://api.linkedin.com/v2/userinfo",
                scopes: "openid profile email",
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| OAuthError::UnknownProvider(s.to_string()))
    }
}

pub(crate) struct Endpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub userinfo_url: &'static str,
    pub scopes: &'static str,
}

/// Endpoint metadata and credentials for one provider. Built once at startup.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}
