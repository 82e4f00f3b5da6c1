//! OAuth 2.0 authorization-code login against a fixed set of identity
//! providers.

mod client;
mod profile;
mod provider;
mod registry;

#[cfg(any(test, feature = "testing"))]
pub use client::MockOAuthClient;
pub use client::{HttpOAuthClient, OAuthClient};
pub use oauth2::{AccessToken, CsrfToken};
pub use profile::UserProfile;
pub use provider::{Provider, ProviderConfig};
pub use registry::{AuthorizationRequest, ProviderRegistry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Unsupported provider: {0}")]
    UnknownProvider(String),

    #[error("OAuth configuration error: {0}")]
    Configuration(String),

    #[error("Invalid or missing OAuth state")]
    InvalidState,

    #[error("Authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("OAuth token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Failed to fetch user profile: {0}")]
    ProfileFetch(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
