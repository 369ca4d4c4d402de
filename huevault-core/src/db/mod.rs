mod color_repo;

pub use color_repo::{ColorRepository, MarkSynced};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use uuid::Uuid;

/// Errors from the local color store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database rejected a read or write.
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to create database directory '{0}': {1}")]
    Directory(String, std::io::Error),
    #[error("Color not found: {0}")]
    NotFound(Uuid),
    /// A stored row could not be turned back into a record.
    #[error("Corrupt color row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Open (or create) the database at `path` and run migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Directory(parent.display().to_string(), e))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
