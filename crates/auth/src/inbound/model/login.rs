use app_core::oauth::UserProfile;
use serde::{Deserialize, Serialize};

// ╔════════════════════════════╗
// ║        Start Login         ║
// ╚════════════════════════════╝

#[derive(Debug, Default, Deserialize)]
pub struct StartLoginRequest {
    pub next: Option<String>,
}

// ╔════════════════════════════╗
// ║      Login Callback        ║
// ╚════════════════════════════╝

/// Query string the provider redirects back with. On denial `code` is absent
/// and `error` is set instead.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

// ╔════════════════════════════╗
// ║           Index            ║
// ╚════════════════════════════╝

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub user: Option<UserProfile>,
}
