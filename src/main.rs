use std::io;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shoal::blob::BlobStore;
use shoal::security::token::SessionKeys;
use shoal::{db, handlers, jobs, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration loading failed: {e}");
            eprintln!("ERROR: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("starting shoal v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("environment: {}", config.app.env);

    if let Some(dir) = db::database_parent_dir(&config.database.url) {
        std::fs::create_dir_all(&dir)?;
    }

    let pool = match db::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("database setup failed: {e}");
            eprintln!("ERROR: failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let blobs = match BlobStore::open(config.blobs.root.clone(), config.blobs.chunk_size) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("blob store setup failed: {e}");
            eprintln!("ERROR: failed to open blob store: {e}");
            std::process::exit(1);
        }
    };

    let keys = web::Data::new(SessionKeys::new(
        &config.session.secret,
        config.session.ttl_hours,
    ));

    tokio::spawn(jobs::reconcile::run_reconciler(
        pool.clone(),
        blobs.clone(),
        Duration::from_secs(config.jobs.reconcile_interval_secs),
        Duration::from_secs(config.jobs.blob_grace_secs),
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("listening on {bind_address}");

    let pool_data = web::Data::new(pool);
    let blobs_data = web::Data::new(blobs);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(blobs_data.clone())
            .app_data(keys.clone())
            .app_data(config_data.clone())
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
