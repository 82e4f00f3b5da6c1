//! A centralized error type for the web layer. Every variant renders as a
//! JSON body without internal detail; the detail goes to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bb8_redis::{bb8, redis};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use super::config::ConfigError;
use super::oauth::OAuthError;

pub const AUTHENTICATION_FAILED_MSG: &str = "Authentication failed";
const INTERNAL_ERROR_MSG: &str = "An internal server error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request format: {0}")]
    RequestFormat(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Internal Libraries
    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("OAuth operation failed")]
    OAuth(#[from] OAuthError),

    // Third Party Libraries
    #[error("Redis operation failed")]
    Redis(#[from] redis::RedisError),

    #[error("Redis connection pool operation failed")]
    RedisPool(#[from] bb8::RunError<redis::RedisError>),

    #[error("Serde JSON operation failed")]
    JsonParse(#[from] serde_json::Error),

    #[error("An internal server error occurred")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Validation(err) => {
                let details = json!(err.field_errors());
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string(), Some(details))
            },
            AppError::RequestFormat(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),

            // Internal Libraries
            AppError::Config(err) => {
                tracing::error!("Config getter error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG.to_string(), None)
            },
            AppError::OAuth(err) => {
                let status = match err {
                    OAuthError::UnknownProvider(_) => StatusCode::NOT_FOUND,

                    OAuthError::InvalidState
                    | OAuthError::AuthorizationDenied(_)
                    | OAuthError::TokenExchange(_)
                    | OAuthError::ProfileFetch(_) => StatusCode::UNAUTHORIZED,

                    OAuthError::HttpClient(_) => StatusCode::BAD_GATEWAY,

                    OAuthError::Configuration(_) | OAuthError::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };

                let message = match err {
                    OAuthError::UnknownProvider(_) => err.to_string(),
                    OAuthError::InvalidState
                    | OAuthError::AuthorizationDenied(_)
                    | OAuthError::TokenExchange(_)
                    | OAuthError::ProfileFetch(_) => {
                        tracing::warn!("OAuth login rejected: {}", err);
                        AUTHENTICATION_FAILED_MSG.to_string()
                    },
                    OAuthError::HttpClient(_) => "OAuth provider unavailable".to_string(),
                    OAuthError::Configuration(_) | OAuthError::InvalidUrl(_) => {
                        tracing::error!("OAuth configuration error: {:?}", err);
                        INTERNAL_ERROR_MSG.to_string()
                    },
                };

                (status, message, None)
            },

            // Third Party Libraries
            AppError::Redis(err) | AppError::RedisPool(bb8::RunError::User(err)) => {
                tracing::error!("Redis error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG.to_string(), None)
            },
            AppError::RedisPool(bb8::RunError::TimedOut) => {
                tracing::error!("Redis connection pool timed out");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG.to_string(), None)
            },
            AppError::JsonParse(err) => {
                tracing::error!("Failed to parse JSON: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG.to_string(), None)
            },
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MSG.to_string(), None),
        };

        (status, Json(ErrorResponse { message, details })).into_response()
    }
}
