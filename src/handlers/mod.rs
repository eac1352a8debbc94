/// HTTP request handlers
///
/// Handlers do request/response conversion only; business logic lives in the
/// service layer.
pub mod auth;
pub mod images;
pub mod posts;

use actix_web::{web, HttpResponse};
use sqlx::SqlitePool;

/// Route table, shared by the binary and the integration tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/logout", web::get().to(auth::logout))
        .route("/profile", web::get().to(posts::profile))
        .route("/post", web::post().to(posts::create_post))
        .route("/delete-post", web::post().to(posts::delete_post))
        .route("/image/{name}", web::get().to(images::serve_image));
}

async fn health(pool: web::Data<SqlitePool>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("database probe failed: {e}"),
        })),
    }
}
