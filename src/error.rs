/// Error types for the service.
///
/// Every failure a handler can surface is an [`AppError`]; the
/// `ResponseError` impl maps each variant onto its HTTP response.
/// Authentication failures are special-cased: they redirect to the login
/// surface and discard the session cookie.
use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::security::token::SESSION_COOKIE;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Client-supplied data fails a precondition
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown email or wrong password; the two are indistinguishable
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed, tampered, or expired session
    #[error("authentication required")]
    Unauthenticated,

    /// Referenced entity absent
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate unique key
    #[error("{0}")]
    Conflict(String),

    /// Attachment write to the blob store failed
    #[error("attachment upload failed: {0}")]
    UploadFailed(String),

    /// Record store unavailable or misbehaving
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Unauthenticated = self {
            let mut response = HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish();
            let mut cookie = Cookie::new(SESSION_COOKIE, "");
            cookie.set_path("/");
            let _ = response.add_removal_cookie(&cookie);
            return response;
        }

        let status = self.status_code();
        let message = match self {
            // Don't leak storage internals to clients
            AppError::Storage(_) | AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("database error: {}", err);
        AppError::Storage(err.to_string())
    }
}
