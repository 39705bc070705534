//! Database schema and migrations
//!
//! Versions are additive: each one only creates tables, indexes or columns,
//! so rows written under an older version stay readable after an upgrade.
//! Uses SQLite with WAL mode so readers never observe an uncommitted write.

use crate::error::{AppError, Result};
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize database with the full schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    migrate_to(pool, latest_version()).await
}

/// Highest schema version known to this build
pub fn latest_version() -> i32 {
    get_migrations()
        .iter()
        .map(|(version, _)| *version)
        .max()
        .unwrap_or(0)
}

/// Current schema version recorded in the database
pub async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    Ok(version)
}

/// Bring the schema up to `target`, applying only the missing versions
pub(crate) async fn migrate_to(pool: &SqlitePool, target: i32) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current = current_version(pool).await?;

    tracing::info!("Current database version: {}", current);

    apply_migrations(pool, current, target).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32, target: i32) -> Result<()> {
    let migrations = get_migrations();

    for (version, sql) in migrations {
        if version > current_version && version <= target {
            tracing::info!("Applying migration version {}", version);

            // Execute migration in a transaction
            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| AppError::Migration(format!("version {}: {}", version, e)))?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, include_str!("migrations/001_initial_schema.sql")),
        (2, include_str!("migrations/002_agreements_workers.sql")),
        (3, include_str!("migrations/003_settings.sql")),
        (4, include_str!("migrations/004_profiles_session.sql")),
        (5, include_str!("migrations/005_entry_wagons.sql")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_database() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        assert_eq!(current_version(&pool).await.unwrap(), latest_version());

        for table in [
            "daily_entries",
            "daily_earnings",
            "sync_queue",
            "agreements",
            "workers",
            "settings",
            "profiles",
            "offline_session",
        ] {
            let count: i32 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();

        let foreign_keys: i32 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(foreign_keys, 1);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pool = memory_pool().await;

        initialize_database(&pool).await.unwrap();
        initialize_database(&pool).await.unwrap();

        let applied: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, latest_version());
    }

    #[tokio::test]
    async fn test_upgrade_keeps_existing_rows_readable() {
        let pool = memory_pool().await;

        // Version 1 only has entries without the wagons column
        migrate_to(&pool, 1).await.unwrap();
        sqlx::query(
            "INSERT INTO daily_entries (user_id, entry_date, day_type, tonnage, synced)
             VALUES ('u1', '2024-03-01', 'Work Day', 12.5, 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        initialize_database(&pool).await.unwrap();

        let (tonnage, wagons, synced): (f64, i64, bool) = sqlx::query_as(
            "SELECT tonnage, wagons, synced FROM daily_entries WHERE user_id = 'u1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(tonnage, 12.5);
        assert_eq!(wagons, 0);
        assert!(synced);
    }

    #[tokio::test]
    async fn test_composite_index_enforces_one_entry_per_day() {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();

        let insert = "INSERT INTO daily_entries (user_id, entry_date, day_type) VALUES ('u1', '2024-03-01', 'Rest Day')";
        sqlx::query(insert).execute(&pool).await.unwrap();

        assert!(sqlx::query(insert).execute(&pool).await.is_err());
    }
}
