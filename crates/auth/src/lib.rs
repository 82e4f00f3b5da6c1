mod domain;
mod inbound;
mod outbound;
mod usecase;

use std::sync::Arc;

use app_core::config::Config;
use app_core::oauth::{OAuthClient, ProviderRegistry};
pub use inbound::http::login::SESSION_COOKIE;
pub use inbound::router::create_router;
pub use inbound::state::AuthState;
pub use outbound::session::{SessionMemory, SessionRedis, SessionStore};
use tower_cookies::Key;

use crate::usecase::login::LoginService;

pub struct Dependency {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub oauth: Arc<dyn OAuthClient>,
    pub session: Arc<dyn SessionStore>,
    pub cookie_key: Key,
}

pub fn new(dep: Dependency) -> AuthState {
    let login_svc = Arc::new(LoginService::new(dep.config.clone(), dep.registry, dep.oauth, dep.session));

    AuthState::new(dep.cookie_key, dep.config, login_svc)
}
