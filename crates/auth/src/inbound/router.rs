use axum::Router;
use axum::routing::get;

use crate::inbound::http::login::*;
use crate::inbound::state::AuthState;

pub fn create_router(state: AuthState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/auth/{provider}", get(social_login))
        .route("/auth/{provider}/callback", get(auth_callback))
        .route("/success", get(success))
        .route("/failure", get(failure))
        .route("/logout", get(logout))
        .with_state(state)
}
