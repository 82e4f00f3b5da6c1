use std::collections::HashMap;

use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, TokenUrl};

use super::{OAuthError, Provider, ProviderConfig};
use crate::config::Config;

/// The redirect a login attempt starts with, plus the state value the
/// provider will echo back.
#[derive(Debug)]
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_token: CsrfToken,
}

impl ProviderConfig {
    /// Builds the authorization URL for this provider with a fresh random
    /// `state`.
    pub fn authorize(&self, redirect_uri: &str) -> Result<AuthorizationRequest, OAuthError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(AuthUrl::new(self.authorize_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);

        let (url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .url();

        Ok(AuthorizationRequest { url: url.to_string(), csrf_token })
    }
}

/// Immutable provider table, built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Provider, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new(configs: impl IntoIterator<Item = ProviderConfig>) -> Self {
        Self { providers: configs.into_iter().map(|c| (c.provider, c)).collect() }
    }

    /// Reads every provider from `oauth.<provider>.*`. All credential pairs
    /// are required; the error lists every missing key at once.
    pub fn from_config(config: &Config) -> Result<Self, OAuthError> {
        let mut missing = Vec::new();
        let mut configs = Vec::with_capacity(Provider::ALL.len());

        for provider in Provider::ALL {
            let key = |field: &str| format!("oauth.{provider}.{field}");

            let client_id = config.get_non_empty(&key("client_id"));
            let client_secret = config.get_non_empty(&key("client_secret"));

            let (Some(client_id), Some(client_secret)) = (client_id.clone(), client_secret.clone()) else {
                if client_id.is_none() {
                    missing.push(key("client_id"));
                }
                if client_secret.is_none() {
                    missing.push(key("client_secret"));
                }
                continue;
            };

            let defaults = provider.default_endpoints();
            let authorize_url =
                config.get_non_empty(&key("authorize_url")).unwrap_or_else(|| defaults.authorize_url.to_string());
            let token_url = config.get_non_empty(&key("token_url")).unwrap_or_else(|| defaults.token_url.to_string());
            let userinfo_url =
                config.get_non_empty(&key("userinfo_url")).unwrap_or_else(|| defaults.userinfo_url.to_string());
            let scopes = config
                .get_non_empty(&key("scopes"))
                .unwrap_or_else(|| defaults.scopes.to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect();

            AuthUrl::new(authorize_url.clone())?;
            TokenUrl::new(token_url.clone())?;
            Url::parse(&userinfo_url)?;

            configs.push(ProviderConfig {
                provider,
                client_id,
                client_secret,
                authorize_url,
                token_url,
                userinfo_url,
                scopes,
            });
        }

        if !missing.is_empty() {
            return Err(OAuthError::Configuration(format!("missing credentials: {}", missing.join(", "))));
        }

        tracing::info!("OAuth providers registered: {:?}", Provider::ALL);

        Ok(Self::new(configs))
    }

    pub fn get(&self, provider: Provider) -> Result<&ProviderConfig, OAuthError> {
        self.providers
            .get(&provider)
            .ok_or_else(|| OAuthError::UnknownProvider(provider.to_string()))
    }

    /// Looks a provider up by its raw path identifier.
    pub fn resolve(&self, name: &str) -> Result<&ProviderConfig, OAuthError> {
        self.get(name.parse()?)
    }
}
