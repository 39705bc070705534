//! Repository layer for the local mirror
//!
//! Reads go straight to the pool. Every write goes through a [`StoreTx`]
//! opened with [`Repository::begin`], so a unit of work is all-or-nothing.

use super::changes::{Table, TableChange};
use super::models::*;
use super::transaction::StoreTx;
use crate::config::CHANGE_FEED_CAPACITY;
use crate::error::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    changes: broadcast::Sender<TableChange>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Receive a notification for every table written by a committed transaction
    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.changes.subscribe()
    }

    /// Open a transaction that may write the listed tables
    pub async fn begin(&self, tables: &[Table]) -> Result<StoreTx> {
        let tx = self.pool.begin().await?;
        Ok(StoreTx::new(tx, tables, self.changes.clone()))
    }

    // ===== Daily entries =====

    /// Get the entry for a user on a date
    pub async fn get_entry(&self, user_id: &str, entry_date: NaiveDate) -> Result<Option<DailyEntry>> {
        let entry = sqlx::query_as::<_, DailyEntry>(
            r#"
            SELECT * FROM daily_entries WHERE user_id = ? AND entry_date = ?
            "#,
        )
        .bind(user_id)
        .bind(entry_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Range scan over the (user_id, entry_date) index, both ends inclusive
    pub async fn entries_between(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyEntry>> {
        let entries = sqlx::query_as::<_, DailyEntry>(
            r#"
            SELECT * FROM daily_entries
            WHERE user_id = ? AND entry_date BETWEEN ? AND ?
            ORDER BY entry_date ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// All entries of a user, oldest first
    pub async fn list_entries(&self, user_id: &str) -> Result<Vec<DailyEntry>> {
        let entries = sqlx::query_as::<_, DailyEntry>(
            r#"
            SELECT * FROM daily_entries WHERE user_id = ? ORDER BY entry_date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn earnings_for_entry(&self, entry_local_id: i64) -> Result<Vec<DailyEarning>> {
        let earnings = sqlx::query_as::<_, DailyEarning>(
            r#"
            SELECT * FROM daily_earnings WHERE entry_local_id = ? ORDER BY local_id ASC
            "#,
        )
        .bind(entry_local_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(earnings)
    }

    /// Earnings of every entry in the inclusive date window
    pub async fn earnings_between(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyEarning>> {
        let earnings = sqlx::query_as::<_, DailyEarning>(
            r#"
            SELECT e.* FROM daily_earnings e
            JOIN daily_entries d ON d.local_id = e.entry_local_id
            WHERE d.user_id = ? AND d.entry_date BETWEEN ? AND ?
            ORDER BY d.entry_date ASC, e.local_id ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(earnings)
    }

    /// All earnings of a user, grouped by entry in insertion order
    pub async fn list_earnings(&self, user_id: &str) -> Result<Vec<DailyEarning>> {
        let earnings = sqlx::query_as::<_, DailyEarning>(
            r#"
            SELECT * FROM daily_earnings WHERE user_id = ? ORDER BY entry_local_id ASC, local_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(earnings)
    }

    /// Count entries still waiting for remote confirmation
    pub async fn count_unsynced(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM daily_entries WHERE user_id = ? AND synced = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ===== Agreements, roster, settings, profile =====

    pub async fn get_agreement(&self, user_id: &str, name: AgreementName) -> Result<Option<Agreement>> {
        let agreement = sqlx::query_as::<_, Agreement>(
            r#"
            SELECT * FROM agreements WHERE user_id = ? AND agreement_name = ?
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(agreement)
    }

    pub async fn list_agreements(&self, user_id: &str) -> Result<Vec<Agreement>> {
        let agreements = sqlx::query_as::<_, Agreement>(
            "SELECT * FROM agreements WHERE user_id = ? ORDER BY agreement_name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(agreements)
    }

    /// Roster in the order it was saved
    pub async fn list_workers(&self, user_id: &str) -> Result<Vec<Worker>> {
        let workers = sqlx::query_as::<_, Worker>(
            r#"
            SELECT user_id, worker_name FROM workers WHERE user_id = ? ORDER BY local_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(workers)
    }

    pub async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            SELECT user_id, agreement_start_date, is_wagon_system_enabled,
                   is_penalty_system_enabled, penalty_amount
            FROM settings WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, allowed_workers FROM profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::try_from).transpose()?)
    }

    // ===== Session =====

    /// Session saved by the last login, if any
    pub async fn load_session(&self) -> Result<Option<OfflineSession>> {
        let session = sqlx::query_as::<_, OfflineSession>(
            "SELECT * FROM offline_session ORDER BY saved_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
