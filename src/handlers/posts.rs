/// Post handlers - publishing, deletion, and the profile view
use actix_multipart::{Field, Multipart};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::AuthSession;
use crate::models::{Post, User};
use crate::services::content::ContentService;

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    /// URL of the attached image, if any
    pub image: Option<String>,
    pub date: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            content: post.content,
            image: post.image.map(|name| format!("/image/{name}")),
            date: post.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub posts: Vec<PostView>,
}

impl ProfileResponse {
    fn new(user: User, posts: Vec<Post>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            age: user.age,
            posts: posts.into_iter().map(PostView::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeletePostForm {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
}

fn content_service(
    pool: &web::Data<SqlitePool>,
    blobs: &web::Data<BlobStore>,
    config: &web::Data<Config>,
) -> ContentService {
    ContentService::new(
        pool.get_ref().clone(),
        blobs.get_ref().clone(),
        config.uploads.max_bytes,
    )
}

/// The signed-in user's record with their resolved posts
pub async fn profile(
    session: AuthSession,
    pool: web::Data<SqlitePool>,
    blobs: web::Data<BlobStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let service = content_service(&pool, &blobs, &config);
    let (user, posts) = service.profile(session.user_id).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse::new(user, posts)))
}

/// Publish a post from a multipart form with a `content` text field and an
/// optional `image` file field
pub async fn create_post(
    session: AuthSession,
    pool: web::Data<SqlitePool>,
    blobs: web::Data<BlobStore>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let service = content_service(&pool, &blobs, &config);
    let max_bytes = config.uploads.max_bytes;

    let mut content_bytes: Vec<u8> = Vec::new();
    let mut image: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart request: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "content" => {
                while let Some(chunk) = next_chunk(&mut field).await? {
                    if content_bytes.len() + chunk.len() > max_bytes as usize {
                        return Err(AppError::InvalidInput("post text too large".to_string()));
                    }
                    content_bytes.extend_from_slice(&chunk);
                }
            }
            "image" => {
                // A file input left empty submits a part with no filename;
                // treat that as no attachment.
                let original_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .filter(|f| !f.is_empty())
                    .map(|f| f.to_string());
                let Some(original_name) = original_name else {
                    drain(&mut field).await?;
                    continue;
                };

                let is_image = field
                    .content_type()
                    .map(|m| m.type_() == mime::IMAGE)
                    .unwrap_or(false);
                if !is_image {
                    return Err(AppError::InvalidInput(
                        "not an image; please upload an image".to_string(),
                    ));
                }
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let body = field.map_err(|e| {
                    AppError::UploadFailed(format!("attachment read failed: {e}"))
                });
                image = Some(
                    service
                        .store_attachment(&content_type, &original_name, body)
                        .await?,
                );
            }
            _ => drain(&mut field).await?,
        }
    }

    let content = String::from_utf8(content_bytes)
        .map_err(|_| AppError::InvalidInput("post text must be valid UTF-8".to_string()))?;

    service.publish(session.user_id, &content, image).await?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/profile"))
        .finish())
}

/// Delete one of the signed-in user's posts
pub async fn delete_post(
    session: AuthSession,
    pool: web::Data<SqlitePool>,
    blobs: web::Data<BlobStore>,
    config: web::Data<Config>,
    form: web::Form<DeletePostForm>,
) -> Result<HttpResponse> {
    let raw = form.into_inner().post_id.unwrap_or_default();
    let post_id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput("invalid post id".to_string()))?;

    let service = content_service(&pool, &blobs, &config);
    service.delete(session.user_id, post_id).await?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/profile"))
        .finish())
}

async fn next_chunk(field: &mut Field) -> Result<Option<bytes::Bytes>> {
    field
        .try_next()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart field: {e}")))
}

/// Consume a field so the multipart stream stays in sync
async fn drain(field: &mut Field) -> Result<()> {
    while next_chunk(field).await?.is_some() {}
    Ok(())
}
