use app_core::error::{AUTHENTICATION_FAILED_MSG, AppError};
use app_core::extractors::{AppPath, AppQuery};
use app_core::oauth::UserProfile;
use app_core::response::Response;
use axum::debug_handler;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::{IntoResponse, Redirect};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::domain::inout::prelude::*;
use crate::inbound::model::prelude::*;
use crate::inbound::state::AuthState;

pub const SESSION_COOKIE: &str = "oauth_session";
const FAILURE_PATH: &str = "/failure";
const INDEX_PATH: &str = "/";

/// Reads the session id from the encrypted session cookie. Tampered or
/// malformed cookies count as no session.
fn session_id(state: &AuthState, cookies: &Cookies) -> Option<String> {
    cookies
        .private(&state.cookie_key)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|sid| Uuid::parse_str(sid).is_ok())
}

/// Returns the current session id, issuing a new session cookie when the
/// browser has none.
fn ensure_session_id(state: &AuthState, cookies: &Cookies) -> String {
    if let Some(sid) = session_id(state, cookies) {
        return sid;
    }

    let sid = Uuid::new_v4().to_string();
    let secure = !state.config.get_or("debug", false).unwrap_or(false);

    let cookie = Cookie::build((SESSION_COOKIE, sid.clone()))
        .http_only(true)
        .secure(secure)
        .path("/")
        .same_site(SameSite::Lax)
        .build();

    cookies.private(&state.cookie_key).add(cookie);

    sid
}

/// Host used to build the callback URL: `server.public_host` when set,
/// otherwise the request's `Host` header.
fn request_host(state: &AuthState, headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(host) = state.config.get_non_empty("server.public_host") {
        return Ok(host);
    }

    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::RequestFormat("Missing Host header".to_string()))
}

fn failure_redirect(err: AppError) -> Redirect {
    tracing::warn!(error = ?err, "Login flow failed");
    Redirect::to(FAILURE_PATH)
}

#[debug_handler]
pub async fn index(State(state): State<AuthState>, cookies: Cookies) -> Result<Response<IndexResponse>, AppError> {
    let user = match session_id(&state, &cookies) {
        Some(session_id) => state.login.profile(ProfileInput { session_id }).await?.user,
        None => None,
    };

    Ok(Response::from(IndexResponse { user }))
}

#[debug_handler]
pub async fn social_login(
    State(state): State<AuthState>,
    cookies: Cookies,
    headers: HeaderMap,
    AppPath(provider): AppPath<String>,
    AppQuery(query): AppQuery<StartLoginRequest>,
) -> impl IntoResponse {
    let host = match request_host(&state, &headers) {
        Ok(host) => host,
        Err(err) => return failure_redirect(err),
    };
    let session_id = ensure_session_id(&state, &cookies);

    match state.login.start(StartLoginInput { provider, session_id, host, next: query.next }).await {
        Ok(output) => Redirect::to(&output.auth_url),
        Err(err) => failure_redirect(err),
    }
}

#[debug_handler]
pub async fn auth_callback(
    State(state): State<AuthState>,
    cookies: Cookies,
    headers: HeaderMap,
    AppPath(provider): AppPath<String>,
    AppQuery(query): AppQuery<CallbackRequest>,
) -> impl IntoResponse {
    let Some(session_id) = session_id(&state, &cookies) else {
        tracing::warn!(provider = %provider, "OAuth callback without a session cookie");
        return Redirect::to(FAILURE_PATH);
    };

    let host = match request_host(&state, &headers) {
        Ok(host) => host,
        Err(err) => return failure_redirect(err),
    };

    let input = CallbackInput {
        provider,
        session_id,
        host,
        code: query.code.unwrap_or_default(),
        state: query.state.unwrap_or_default(),
        error: query.error,
    };

    match state.login.callback(input).await {
        Ok(output) => Redirect::to(&output.redirect_to),
        Err(err) => failure_redirect(err),
    }
}

#[debug_handler]
pub async fn success(
    State(state): State<AuthState>,
    cookies: Cookies,
) -> Result<Response<UserProfile>, Redirect> {
    let Some(session_id) = session_id(&state, &cookies) else {
        return Err(Redirect::to(FAILURE_PATH));
    };

    match state.login.profile(ProfileInput { session_id }).await {
        Ok(ProfileOutput { user: Some(profile) }) => {
            Ok(Response::with_message(profile, "Login successful"))
        },
        Ok(ProfileOutput { user: None }) => Err(Redirect::to(FAILURE_PATH)),
        Err(err) => Err(failure_redirect(err)),
    }
}

#[debug_handler]
pub async fn failure() -> impl IntoResponse {
    AppError::Unauthorized(AUTHENTICATION_FAILED_MSG.to_string())
}

#[debug_handler]
pub async fn logout(State(state): State<AuthState>, cookies: Cookies) -> impl IntoResponse {
    if let Some(session_id) = session_id(&state, &cookies) {
        if let Err(err) = state.login.logout(LogoutInput { session_id }).await {
            tracing::error!(error = ?err, "Failed to clear session");
        }
    }

    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.private(&state.cookie_key).remove(cookie);

    Redirect::to(INDEX_PATH)
}
