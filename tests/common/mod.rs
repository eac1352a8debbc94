#![allow(dead_code)]

use bytes::Bytes;
use sqlx::SqlitePool;
use tempfile::TempDir;

use shoal::blob::BlobStore;
use shoal::config::{
    AppConfig, BlobConfig, Config, DatabaseConfig, JobsConfig, SessionConfig, UploadConfig,
};
use shoal::db;
use shoal::models::User;
use shoal::services::accounts::{AccountService, NewAccount};

pub struct TestContext {
    // Held for its Drop; removing the directory tears the stores down.
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub blobs: BlobStore,
    pub config: Config,
}

pub async fn setup() -> TestContext {
    let dir = tempfile::tempdir().expect("create tempdir");

    let config = Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("test.db").display()),
            max_connections: 8,
        },
        blobs: BlobConfig {
            root: dir.path().join("blobs"),
            chunk_size: 1024,
        },
        session: SessionConfig {
            secret: "test-signing-secret".to_string(),
            ttl_hours: None,
        },
        uploads: UploadConfig {
            max_bytes: 5 * 1024 * 1024,
        },
        jobs: JobsConfig {
            reconcile_interval_secs: 300,
            blob_grace_secs: 3600,
        },
    };

    let pool = db::connect(&config.database).await.expect("open database");
    let blobs = BlobStore::open(config.blobs.root.clone(), config.blobs.chunk_size)
        .expect("open blob store");

    TestContext {
        dir,
        pool,
        blobs,
        config,
    }
}

pub async fn register_user(pool: &SqlitePool, username: &str, email: &str) -> User {
    AccountService::new(pool.clone())
        .register(NewAccount {
            username: username.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "correct horse battery staple".to_string(),
            age: 30,
        })
        .await
        .expect("register user")
}

/// One-shot byte stream for attachment uploads
pub fn byte_stream(data: Vec<u8>) -> impl futures::Stream<Item = shoal::Result<Bytes>> {
    futures::stream::iter(vec![Ok(Bytes::from(data))])
}
