//! Converts Axum's extractor rejections into [`AppError`].

use axum::extract::rejection::{PathRejection, QueryRejection};

use super::error::AppError;

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::RequestFormat(rejection.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::RequestFormat(rejection.to_string())
    }
}
