/// Default post-login destination when the login did not ask for one.
pub const DEFAULT_REDIRECT_PATH: &str = "/success";

/// The values a login keeps in the browser's server-side session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    /// Anti-forgery nonce sent as `state`. Single use.
    OAuthState,
    /// Where to send the browser once the callback succeeds.
    RedirectPath,
    /// The normalized profile of the logged-in user, as JSON.
    UserData,
}

impl SessionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::OAuthState => "oauth_state",
            SessionKey::RedirectPath => "redirect_path",
            SessionKey::UserData => "user_data",
        }
    }
}

/// Accepts only same-origin absolute paths, so `next` cannot turn the login
/// into an open redirect.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') && !path.contains("://")
}
