use std::sync::Arc;

use app_core::config::Config;
use tower_cookies::Key;

use crate::usecase::login::LoginUseCase;

#[derive(Clone)]
pub struct AuthState {
    pub cookie_key: Key,
    pub config: Arc<Config>,
    pub login: Arc<dyn LoginUseCase>,
}

impl AuthState {
    pub fn new(cookie_key: Key, config: Arc<Config>, login: Arc<dyn LoginUseCase>) -> Self {
        Self { cookie_key, config, login }
    }
}

#[cfg(test)]
mod tests {
    use app_core::config::test_utils::TestConfigBuilder;

    use super::*;
    use crate::usecase::login::MockLoginUseCase;

    #[test]
    fn test_auth_state_new() {
        let cookie_key = Key::generate();
        let login: Arc<dyn LoginUseCase> = Arc::new(MockLoginUseCase::new());
        let config = Arc::new(TestConfigBuilder::new().build());

        let state = AuthState::new(cookie_key.clone(), config.clone(), login.clone());

        assert!(Arc::ptr_eq(&state.login, &login));
        assert!(Arc::ptr_eq(&state.config, &config));
        assert_eq!(state.cookie_key.master(), cookie_key.master());
    }
}
