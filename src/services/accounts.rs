/// Account service - registration and login
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::security::password::{hash_password, verify_password};

/// Fields required to open an account
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: i64,
}

pub struct AccountService {
    pool: SqlitePool,
}

impl AccountService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new account
    ///
    /// Hashing runs on the blocking pool so concurrent requests keep moving.
    /// Duplicate email or username reports a conflict; the insert itself
    /// backstops the check against racing registrations.
    pub async fn register(&self, account: NewAccount) -> Result<User> {
        if users::email_exists(&self.pool, &account.email).await? {
            return Err(AppError::Conflict(
                "a user with that email already exists".to_string(),
            ));
        }
        if users::username_exists(&self.pool, &account.username).await? {
            return Err(AppError::Conflict("that username is taken".to_string()));
        }

        let password = account.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;

        let user = User {
            id: Uuid::new_v4(),
            username: account.username,
            name: account.name,
            email: account.email,
            age: account.age,
            password_hash,
            post_ids: Json(Vec::new()),
            created_at: Utc::now(),
        };

        users::create_user(&self.pool, &user).await?;
        tracing::info!(user_id = %user.id, "created user");

        Ok(user)
    }

    /// Authenticate by email and password
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = users::find_by_email(&self.pool, email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))??;

        if !ok {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }
}
