use app_core::oauth::UserProfile;
use validator::Validate;

// ╔════════════════════════════╗
// ║        Start Login         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct StartLoginInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,
    #[validate(length(min = 1, message = "session id cannot be empty"))]
    pub session_id: String,
    #[validate(length(min = 1, message = "host cannot be empty"))]
    pub host: String,
    /// Requested post-login destination. Ignored unless it is a local path.
    pub next: Option<String>,
}

#[derive(Debug)]
pub struct StartLoginOutput {
    pub auth_url: String,
}

// ╔════════════════════════════╗
// ║      Login Callback        ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct CallbackInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,
    #[validate(length(min = 1, message = "session id cannot be empty"))]
    pub session_id: String,
    #[validate(length(min = 1, message = "host cannot be empty"))]
    pub host: String,
    #[validate(length(min = 1, message = "code cannot be empty"))]
    pub code: String,
    pub state: String,
    /// Set by the provider when the user denied consent.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct CallbackOutput {
    pub profile: UserProfile,
    pub redirect_to: String,
}

// ╔════════════════════════════╗
// ║          Profile           ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct ProfileInput {
    #[validate(length(min = 1, message = "session id cannot be empty"))]
    pub session_id: String,
}

#[derive(Debug)]
pub struct ProfileOutput {
    pub user: Option<UserProfile>,
}

// ╔════════════════════════════╗
// ║          Logout            ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct LogoutInput {
    #[validate(length(min = 1, message = "session id cannot be empty"))]
    pub session_id: String,
}

#[derive(Debug)]
pub struct LogoutOutput {
    pub success: bool,
}
