/// Post row operations
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Post;

/// Insert a new post row
pub async fn create_post(pool: &SqlitePool, post: &Post) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO posts (id, user_id, content, image, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(post.id)
    .bind(post.user_id)
    .bind(&post.content)
    .bind(&post.image)
    .bind(post.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find post by ID
pub async fn find_by_id(pool: &SqlitePool, post_id: Uuid) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?1")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(post)
}

/// Resolve a set of post IDs, newest first
///
/// IDs with no matching row are silently skipped; callers use this to
/// tolerate dangling references.
pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Post>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT * FROM posts WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(") ORDER BY created_at DESC");

    let posts = qb.build_query_as::<Post>().fetch_all(pool).await?;
    Ok(posts)
}

/// All posts owned by a user, newest first
pub async fn find_by_owner(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Post>> {
    let posts = sqlx::query_as::<_, Post>(
        "SELECT * FROM posts WHERE user_id = ?1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Delete a post row; returns whether a row existed
pub async fn delete_post(pool: &SqlitePool, post_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?1")
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Every attachment object name referenced by a live post
pub async fn list_image_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names =
        sqlx::query_scalar::<_, String>("SELECT image FROM posts WHERE image IS NOT NULL")
            .fetch_all(pool)
            .await?;

    Ok(names)
}
