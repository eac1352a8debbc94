/// Configuration management
///
/// All settings load from environment variables with development defaults.
/// Production mode refuses to start with the placeholder signing secret.
use std::path::PathBuf;

const DEV_SESSION_SECRET: &str = "dev-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Blob store configuration
    pub blobs: BlobConfig,
    /// Session token configuration
    pub session: SessionConfig,
    /// Upload limits
    pub uploads: UploadConfig,
    /// Background job configuration
    pub jobs: JobsConfig,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Directory holding attachment objects
    pub root: PathBuf,
    /// Chunk file size in bytes
    pub chunk_size: usize,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC signing secret for session tokens
    pub secret: String,
    /// Optional session lifetime; tokens never expire when unset
    pub ttl_hours: Option<i64>,
}

/// Upload limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum attachment size in bytes
    pub max_bytes: u64,
}

/// Background job configuration
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Seconds between reconciliation cycles
    pub reconcile_interval_secs: u64,
    /// Minimum age before an unreferenced attachment is swept
    pub blob_grace_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let secret =
            std::env::var("SESSION_SECRET").unwrap_or_else(|_| DEV_SESSION_SECRET.to_string());
        if app_env.eq_ignore_ascii_case("production") && secret == DEV_SESSION_SECRET {
            return Err("SESSION_SECRET must be set to a non-default value in production".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("SHOAL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("SHOAL_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/shoal.db".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            blobs: BlobConfig {
                root: std::env::var("BLOB_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/blobs")),
                chunk_size: std::env::var("BLOB_CHUNK_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(255 * 1024),
            },
            session: SessionConfig {
                secret,
                ttl_hours: std::env::var("SESSION_TTL_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            uploads: UploadConfig {
                max_bytes: std::env::var("UPLOAD_MAX_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5 * 1024 * 1024),
            },
            jobs: JobsConfig {
                reconcile_interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
                blob_grace_secs: std::env::var("BLOB_GRACE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3600),
            },
        })
    }
}
