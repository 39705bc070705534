//! Local mirror database
//!
//! The client keeps a SQLite copy of the user's remote rows plus the queue of
//! changes waiting for upload. Reads always come from here; writes go through
//! [`StoreTx`] so the mirror and the queue change together.

pub mod changes;
pub mod models;
pub mod repository;
pub mod schema;
pub mod transaction;

pub use changes::{Table, TableChange};
pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;
pub use transaction::StoreTx;

use crate::config::{DATABASE_BUSY_TIMEOUT_SECS, DATABASE_MAX_CONNECTIONS};
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Options for the mirror file: created on first use, WAL journal, foreign keys on
fn mirror_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(DATABASE_BUSY_TIMEOUT_SECS))
                .journal_mode(SqliteJournalMode::Wal)
                .foreign_keys(true)
        },
    )
}

/// Bring the mirror at `db_path` to the latest schema on one connection
async fn migrate_mirror(db_path: &Path) -> Result<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(mirror_options(db_path)?)
        .await?;

    let migrated = initialize_database(&pool).await;
    pool.close().await;
    migrated
}

/// Open the local mirror database, creating and migrating it as needed.
///
/// The pool shared by the services is only opened once the schema is final.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening local mirror at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    migrate_mirror(db_path).await?;

    let pool = SqlitePoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect_with(mirror_options(db_path)?)
        .await?;

    tracing::info!("Local mirror ready");

    Ok(pool)
}

/// Single-connection in-memory repository for unit tests
#[cfg(test)]
pub(crate) async fn memory_repository() -> Repository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    initialize_database(&pool).await.unwrap();

    Repository::new(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_pool_creates_and_reopens_mirror() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("ledger.db");

        let pool = create_pool(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(
            schema::current_version(&pool).await.unwrap(),
            schema::latest_version()
        );
        pool.close().await;

        let reopened = create_pool(&db_path).await.unwrap();
        assert_eq!(
            schema::current_version(&reopened).await.unwrap(),
            schema::latest_version()
        );
    }
}
