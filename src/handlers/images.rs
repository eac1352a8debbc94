/// Attachment serving
use actix_web::{web, HttpResponse};

use crate::blob::BlobStore;
use crate::error::Result;

/// Stream a stored attachment to the client without buffering it
pub async fn serve_image(
    blobs: web::Data<BlobStore>,
    name: web::Path<String>,
) -> Result<HttpResponse> {
    let object = blobs.get(&name).await?;
    let content_type = object.content_type().to_string();

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .streaming(object.into_stream()))
}
