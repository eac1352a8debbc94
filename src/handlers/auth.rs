/// Auth handlers - registration, login, logout
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::security::token::{SessionKeys, SESSION_COOKIE};
use crate::services::accounts::{AccountService, NewAccount};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish()
}

fn redirect_with_session(location: &str, token: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .cookie(session_cookie(token))
        .finish()
}

/// Register a new user and open a session
pub async fn register(
    pool: web::Data<SqlitePool>,
    keys: web::Data<SessionKeys>,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let (Some(username), Some(name), Some(email), Some(password), Some(age)) = (
        form.username.clone(),
        form.name.clone(),
        form.email.clone(),
        form.password.clone(),
        form.age,
    ) else {
        return Err(AppError::InvalidInput("all fields are required".to_string()));
    };
    if username.is_empty() || name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput("all fields are required".to_string()));
    }

    form.validate()
        .map_err(|e| AppError::InvalidInput(format!("invalid registration data: {e}")))?;

    let service = AccountService::new(pool.get_ref().clone());
    let user = service
        .register(NewAccount {
            username,
            name,
            email,
            password,
            age,
        })
        .await?;

    let token = keys.issue(user.id, &user.email)?;
    Ok(redirect_with_session("/profile", token))
}

/// Log in with email and password
pub async fn login(
    pool: web::Data<SqlitePool>,
    keys: web::Data<SessionKeys>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let (Some(email), Some(password)) = (form.email, form.password) else {
        return Err(AppError::InvalidInput("all fields are required".to_string()));
    };
    if email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput("all fields are required".to_string()));
    }

    let service = AccountService::new(pool.get_ref().clone());
    let user = service.login(&email, &password).await?;

    let token = keys.issue(user.id, &user.email)?;
    Ok(redirect_with_session("/profile", token))
}

/// Drop the session cookie
pub async fn logout() -> HttpResponse {
    let mut response = HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .finish();

    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    let _ = response.add_removal_cookie(&cookie);

    response
}
