/// Row types for the record store
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

/// A registered account and the set of posts it owns.
///
/// `post_ids` mirrors `Post::user_id`; the two sides must agree, and every
/// write to either goes through the content service.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub post_ids: Json<Vec<Uuid>>,
    pub created_at: DateTime<Utc>,
}

/// A published post, owned by exactly one user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    /// Object name of the stored attachment, if any
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}
