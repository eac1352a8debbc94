/// Database access layer
pub mod posts;
pub mod users;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};

/// Open the connection pool and apply pending migrations
pub async fn connect(cfg: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&cfg.url)
        .map_err(|e| AppError::Storage(format!("invalid database url {:?}: {e}", cfg.url)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Storage(format!("migration failed: {e}")))?;

    Ok(pool)
}

/// Parent directory of a `sqlite://` database file, when it lives on disk
pub fn database_parent_dir(url: &str) -> Option<PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_parent_dir() {
        assert_eq!(
            database_parent_dir("sqlite://data/app.db"),
            Some(PathBuf::from("data"))
        );
        assert_eq!(database_parent_dir("sqlite://app.db"), None);
        assert_eq!(database_parent_dir("sqlite::memory:"), None);
        assert_eq!(
            database_parent_dir("sqlite://data/app.db?mode=rwc"),
            Some(PathBuf::from("data"))
        );
    }
}
