/// Session extraction for protected routes
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::security::token::{SessionKeys, SESSION_COOKIE};

/// Verified session identity, extracted from the session cookie
///
/// A missing, malformed, tampered, or expired token fails extraction with
/// [`AppError::Unauthenticated`], which redirects to the login surface and
/// clears the stored cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
}

impl FromRequest for AuthSession {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

fn extract(req: &HttpRequest) -> Result<AuthSession, AppError> {
    let keys = req
        .app_data::<web::Data<SessionKeys>>()
        .ok_or_else(|| AppError::Internal("session keys not configured".to_string()))?;

    let cookie = req.cookie(SESSION_COOKIE).ok_or(AppError::Unauthenticated)?;
    let claims = keys.verify(cookie.value())?;
    let user_id = claims.user_id()?;

    Ok(AuthSession {
        user_id,
        email: claims.email,
    })
}
