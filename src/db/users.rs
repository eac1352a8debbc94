/// User row operations
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;

/// Insert a new user row
///
/// A unique-key collision (two registrations racing past the existence
/// checks) surfaces as a conflict rather than a storage failure.
pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, name, email, age, password_hash, post_ids, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.age)
    .bind(&user.password_hash)
    .bind(&user.post_ids)
    .bind(user.created_at)
    .execute(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("a user with that email or username already exists".to_string())
        }
        _ => AppError::from(e),
    })?;

    Ok(())
}

/// Find user by email
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Find user by ID
pub async fn find_by_id(pool: &SqlitePool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Check if email is taken
pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)")
            .bind(email)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Check if username is taken
pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
            .bind(username)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Replace a user's post reference set
///
/// Whole-set replacement: concurrent writers are last-writer-wins, which is
/// the documented behavior of the reference set.
pub async fn update_post_refs(pool: &SqlitePool, user_id: Uuid, post_ids: &[Uuid]) -> Result<()> {
    sqlx::query("UPDATE users SET post_ids = ?1 WHERE id = ?2")
        .bind(Json(post_ids.to_vec()))
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// IDs of every user, for the reconciliation sweep
pub async fn list_user_ids(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users")
        .fetch_all(pool)
        .await?;

    Ok(ids)
}
