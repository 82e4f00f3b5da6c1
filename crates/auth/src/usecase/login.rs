use std::sync::Arc;

use app_core::config::Config;
use app_core::error::AppError;
use app_core::oauth::{OAuthClient, OAuthError, Provider, ProviderRegistry, UserProfile};
use async_trait::async_trait;
use validator::Validate;

use crate::domain::entity::session::{DEFAULT_REDIRECT_PATH, SessionKey, is_local_path};
use crate::domain::inout::prelude::*;
use crate::outbound::session::SessionStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginUseCase: Send + Sync {
    async fn start(&self, input: StartLoginInput) -> Result<StartLoginOutput, AppError>;
    async fn callback(&self, input: CallbackInput) -> Result<CallbackOutput, AppError>;
    async fn profile(&self, input: ProfileInput) -> Result<ProfileOutput, AppError>;
    async fn logout(&self, input: LogoutInput) -> Result<LogoutOutput, AppError>;
}

#[derive(Clone)]
pub struct LoginService {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    oauth: Arc<dyn OAuthClient>,
    session: Arc<dyn SessionStore>,
}

impl LoginService {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        oauth: Arc<dyn OAuthClient>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self { config, registry, oauth, session }
    }

    /// The URL the provider sends the browser back to. Plain `http` is only
    /// used in debug mode.
    fn callback_url(&self, provider: Provider, host: &str) -> Result<String, AppError> {
        let scheme = if self.config.get_or("debug", false)? { "http" } else { "https" };
        Ok(format!("{scheme}://{host}/auth/{provider}/callback"))
    }
}

#[async_trait]
impl LoginUseCase for LoginService {
    async fn start(&self, input: StartLoginInput) -> Result<StartLoginOutput, AppError> {
        input.validate()?;

        let provider = self.registry.resolve(&input.provider)?;
        let redirect_uri = self.callback_url(provider.provider, &input.host)?;
        let request = provider.authorize(&redirect_uri)?;

        let sid = input.session_id.as_str();
        self.session
            .set(sid, SessionKey::OAuthState.as_str(), request.csrf_token.secret())
            .await?;

        // A new login attempt ends the previous identity, even if it fails.
        self.session.pop(sid, SessionKey::UserData.as_str()).await?;

        match input.next.filter(|next| is_local_path(next)) {
            Some(next) => self.session.set(sid, SessionKey::RedirectPath.as_str(), &next).await?,
            None => {
                self.session.pop(sid, SessionKey::RedirectPath.as_str()).await?;
            },
        }

        tracing::debug!(provider = %provider.provider, "Redirecting to OAuth provider");

        Ok(StartLoginOutput { auth_url: request.url })
    }

    async fn callback(&self, input: CallbackInput) -> Result<CallbackOutput, AppError> {
        let sid = input.session_id.as_str();

        // The nonce is single use whatever happens next.
        let stored_state = self.session.pop(sid, SessionKey::OAuthState.as_str()).await?;

        let provider = self.registry.resolve(&input.provider)?;

        match stored_state {
            Some(expected) if expected == input.state => {},
            Some(_) => {
                tracing::warn!(provider = %provider.provider, "OAuth state mismatch");
                return Err(OAuthError::InvalidState.into());
            },
            None => {
                tracing::warn!(provider = %provider.provider, "OAuth callback without a pending login");
                return Err(OAuthError::InvalidState.into());
            },
        }

        if let Some(error) = input.error {
            tracing::warn!(provider = %provider.provider, error = %error, "Provider denied authorization");
            return Err(OAuthError::AuthorizationDenied(error).into());
        }

        input.validate()?;

        let redirect_uri = self.callback_url(provider.provider, &input.host)?;

        let token = self
            .oauth
            .exchange_code(provider, &input.code, &redirect_uri)
            .await
            .inspect_err(|e| tracing::error!(provider = %provider.provider, "Token exchange failed: {}", e))?;

        let profile = self
            .oauth
            .fetch_profile(provider, &token)
            .await
            .inspect_err(|e| tracing::error!(provider = %provider.provider, "Profile fetch failed: {}", e))?;

        let user_data = serde_json::to_string(&profile)?;
        self.session.set(sid, SessionKey::UserData.as_str(), &user_data).await?;

        let redirect_to = self
            .session
            .pop(sid, SessionKey::RedirectPath.as_str())
            .await?
            .filter(|path| is_local_path(path))
            .unwrap_or_else(|| DEFAULT_REDIRECT_PATH.to_string());

        tracing::info!(provider = %provider.provider, user_id = %profile.id, "User logged in");

        Ok(CallbackOutput { profile, redirect_to })
    }

    async fn profile(&self, input: ProfileInput) -> Result<ProfileOutput, AppError> {
        input.validate()?;

        let user = match self.session.get(&input.session_id, SessionKey::UserData.as_str()).await? {
            Some(raw) => Some(serde_json::from_str::<UserProfile>(&raw)?),
            None => None,
        };

        Ok(ProfileOutput { user })
    }

    async fn logout(&self, input: LogoutInput) -> Result<LogoutOutput, AppError> {
        input.validate()?;

        self.session.clear(&input.session_id).await?;

        Ok(LogoutOutput { success: true })
    }
}
