/// Content service - post publishing, deletion, and profile resolution
///
/// This is the only place that writes both sides of the user/post link.
/// Publishing appends to the owner's reference set after the post row is
/// inserted; deletion removes the row first and the reference second. The
/// two steps are deliberately not transactional: readers tolerate dangling
/// references, and the reconciliation job repairs whatever a crash between
/// the steps leaves behind.
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, TryStreamExt};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::db::{posts, users};
use crate::error::{AppError, Result};
use crate::models::{Post, User};

pub struct ContentService {
    pool: SqlitePool,
    blobs: BlobStore,
    max_upload_bytes: u64,
}

impl ContentService {
    pub fn new(pool: SqlitePool, blobs: BlobStore, max_upload_bytes: u64) -> Self {
        Self {
            pool,
            blobs,
            max_upload_bytes,
        }
    }

    /// Stream an attachment into the blob store, enforcing the upload limit
    ///
    /// Returns the durable object name. On any failure the partial object is
    /// discarded and no record references it.
    pub async fn store_attachment<S>(
        &self,
        content_type: &str,
        original_name: &str,
        body: S,
    ) -> Result<String>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let mut writer = self.blobs.create(content_type, original_name).await?;
        let mut received: u64 = 0;

        futures::pin_mut!(body);
        loop {
            let chunk = match body.try_next().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await;
                    return Err(e);
                }
            };

            received += chunk.len() as u64;
            if received > self.max_upload_bytes {
                writer.abort().await;
                return Err(AppError::InvalidInput(format!(
                    "attachment exceeds the {} byte upload limit",
                    self.max_upload_bytes
                )));
            }

            if let Err(e) = writer.write(&chunk).await {
                writer.abort().await;
                return Err(e);
            }
        }

        writer.finish().await
    }

    /// Publish a post
    ///
    /// The attachment, if any, must already be durably stored; its object
    /// name is recorded on the new row.
    pub async fn publish(
        &self,
        user_id: Uuid,
        content: &str,
        image: Option<String>,
    ) -> Result<Post> {
        if content.is_empty() && image.is_none() {
            return Err(AppError::InvalidInput(
                "post must contain either text or an image".to_string(),
            ));
        }

        let user = users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;

        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            image,
            created_at: Utc::now(),
        };
        posts::create_post(&self.pool, &post).await?;

        // Read-modify-write on the owner's reference set: concurrent
        // publishers race here and the last writer's set wins.
        let mut refs = user.post_ids.0.clone();
        refs.push(post.id);
        users::update_post_refs(&self.pool, user_id, &refs).await?;

        tracing::info!(post_id = %post.id, user_id = %user_id, "published post");
        Ok(post)
    }

    /// Delete a post owned by the requester
    pub async fn delete(&self, requester_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = posts::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("post".to_string()))?;

        // Only the owner may delete. A foreign post reads as missing rather
        // than confirming it exists.
        if post.user_id != requester_id {
            return Err(AppError::NotFound("post".to_string()));
        }

        // Row first, reference second: a crash in between leaves a dangling
        // reference that readers filter and the reconciler removes. The
        // attachment object, if any, is left for the sweep.
        if !posts::delete_post(&self.pool, post_id).await? {
            return Err(AppError::NotFound("post".to_string()));
        }

        if let Some(user) = users::find_by_id(&self.pool, requester_id).await? {
            let refs: Vec<Uuid> = user
                .post_ids
                .0
                .iter()
                .copied()
                .filter(|id| *id != post_id)
                .collect();
            users::update_post_refs(&self.pool, requester_id, &refs).await?;
        }

        tracing::info!(post_id = %post_id, user_id = %requester_id, "deleted post");
        Ok(())
    }

    /// Load a user together with their resolved posts, newest first
    ///
    /// References that no longer resolve are dropped from the view.
    pub async fn profile(&self, user_id: Uuid) -> Result<(User, Vec<Post>)> {
        let user = users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;

        let posts = posts::find_by_ids(&self.pool, &user.post_ids.0).await?;
        Ok((user, posts))
    }
}
