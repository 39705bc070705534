//! Multi-table store transactions
//!
//! A [`StoreTx`] declares up front which tables it may write. Writes only
//! become visible on [`StoreTx::commit`]; dropping the guard rolls back.
//! Change notifications are published after the commit succeeds.

use super::changes::{Table, TableChange};
use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::collections::BTreeSet;
use tokio::sync::broadcast;

pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
    declared: BTreeSet<Table>,
    written: BTreeSet<Table>,
    changes: broadcast::Sender<TableChange>,
}

impl StoreTx {
    pub(crate) fn new(
        tx: Transaction<'static, Sqlite>,
        tables: &[Table],
        changes: broadcast::Sender<TableChange>,
    ) -> Self {
        Self {
            tx,
            declared: tables.iter().copied().collect(),
            written: BTreeSet::new(),
            changes,
        }
    }

    /// Record a write to `table`, rejecting tables the transaction did not declare
    pub(crate) fn write(&mut self, table: Table) -> Result<()> {
        if !self.declared.contains(&table) {
            return Err(AppError::Generic(format!(
                "Table {} is not part of this transaction",
                table
            )));
        }
        self.written.insert(table);
        Ok(())
    }

    pub(crate) fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commit and notify subscribers of every table written
    pub async fn commit(self) -> Result<()> {
        let StoreTx {
            tx,
            written,
            changes,
            ..
        } = self;

        tx.commit().await?;

        for table in written {
            // No subscribers is fine
            let _ = changes.send(TableChange { table });
        }

        Ok(())
    }

    /// Discard every write made through this transaction
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    // ===== Daily entries =====

    /// Supersede any entry for the same user and date with a fresh unsynced one.
    ///
    /// Returns the new entry's local id.
    pub async fn replace_daily_entry(
        &mut self,
        draft: &EntryDraft,
        earnings: &[EarningDraft],
    ) -> Result<i64> {
        self.delete_daily_entry(&draft.user_id, draft.entry_date)
            .await?;

        let local_id = self.insert_entry(draft, None, false).await?;
        for earning in earnings {
            self.insert_earning(local_id, &draft.user_id, None, earning)
                .await?;
        }

        tracing::debug!(
            "Replaced entry for {} on {} with local id {}",
            draft.user_id,
            draft.entry_date,
            local_id
        );
        Ok(local_id)
    }

    /// Delete the entry for (user, date) together with its earnings
    pub async fn delete_daily_entry(
        &mut self,
        user_id: &str,
        entry_date: chrono::NaiveDate,
    ) -> Result<bool> {
        self.write(Table::DailyEntries)?;
        self.write(Table::DailyEarnings)?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT local_id FROM daily_entries WHERE user_id = ? AND entry_date = ?",
        )
        .bind(user_id)
        .bind(entry_date)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(local_id) = existing else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM daily_earnings WHERE entry_local_id = ?")
            .bind(local_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("DELETE FROM daily_entries WHERE local_id = ?")
            .bind(local_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(true)
    }

    pub async fn insert_entry(
        &mut self,
        draft: &EntryDraft,
        remote_id: Option<i64>,
        synced: bool,
    ) -> Result<i64> {
        self.write(Table::DailyEntries)?;

        let local_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO daily_entries (remote_id, user_id, entry_date, day_type, tonnage, wagons, synced)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING local_id
            "#,
        )
        .bind(remote_id)
        .bind(&draft.user_id)
        .bind(draft.entry_date)
        .bind(draft.day_type)
        .bind(draft.tonnage)
        .bind(draft.wagons)
        .bind(synced)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(local_id)
    }

    pub async fn insert_earning(
        &mut self,
        entry_local_id: i64,
        user_id: &str,
        remote_id: Option<i64>,
        earning: &EarningDraft,
    ) -> Result<()> {
        self.write(Table::DailyEarnings)?;

        sqlx::query(
            r#"
            INSERT INTO daily_earnings (remote_id, entry_local_id, user_id, worker_name, earning, attendance_status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(remote_id)
        .bind(entry_local_id)
        .bind(user_id)
        .bind(&earning.worker_name)
        .bind(earning.earning)
        .bind(earning.attendance_status)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Flip the synced flag of one local entry. Never clears it.
    ///
    /// Returns false when the entry no longer exists (superseded locally).
    pub async fn mark_entry_synced(&mut self, local_id: i64, remote_id: i64) -> Result<bool> {
        self.write(Table::DailyEntries)?;

        let rows = sqlx::query(
            "UPDATE daily_entries SET synced = 1, remote_id = ? WHERE local_id = ?",
        )
        .bind(remote_id)
        .bind(local_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    // ===== Roster, agreements, settings, profile =====

    /// Destructively overwrite a user's roster, keeping the given order
    pub async fn replace_workers(&mut self, user_id: &str, names: &[String]) -> Result<()> {
        self.write(Table::Workers)?;

        sqlx::query("DELETE FROM workers WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        for name in names {
            sqlx::query("INSERT INTO workers (user_id, worker_name) VALUES (?, ?)")
                .bind(user_id)
                .bind(name)
                .execute(&mut *self.tx)
                .await?;
        }

        tracing::debug!("Replaced roster for {} with {} workers", user_id, names.len());
        Ok(())
    }

    pub async fn upsert_agreement(&mut self, agreement: &Agreement) -> Result<()> {
        self.write(Table::Agreements)?;

        sqlx::query(
            r#"
            INSERT INTO agreements (
                user_id, agreement_name, ton_rate, rest_rate, layoff_rate, wagon_rate,
                monthly_allowance, allowance_calculation_type, paid_leaves,
                without_paid_leaves, paid_leave_rate
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, agreement_name) DO UPDATE SET
                ton_rate = excluded.ton_rate,
                rest_rate = excluded.rest_rate,
                layoff_rate = excluded.layoff_rate,
                wagon_rate = excluded.wagon_rate,
                monthly_allowance = excluded.monthly_allowance,
                allowance_calculation_type = excluded.allowance_calculation_type,
                paid_leaves = excluded.paid_leaves,
                without_paid_leaves = excluded.without_paid_leaves,
                paid_leave_rate = excluded.paid_leave_rate
            "#,
        )
        .bind(&agreement.user_id)
        .bind(agreement.agreement_name)
        .bind(agreement.ton_rate)
        .bind(agreement.rest_rate)
        .bind(agreement.layoff_rate)
        .bind(agreement.wagon_rate)
        .bind(agreement.monthly_allowance)
        .bind(agreement.allowance_calculation_type)
        .bind(agreement.paid_leaves)
        .bind(agreement.without_paid_leaves)
        .bind(agreement.paid_leave_rate)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn upsert_settings(&mut self, settings: &UserSettings) -> Result<()> {
        self.write(Table::Settings)?;

        sqlx::query(
            r#"
            INSERT INTO settings (
                user_id, agreement_start_date, is_wagon_system_enabled,
                is_penalty_system_enabled, penalty_amount
            )
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                agreement_start_date = excluded.agreement_start_date,
                is_wagon_system_enabled = excluded.is_wagon_system_enabled,
                is_penalty_system_enabled = excluded.is_penalty_system_enabled,
                penalty_amount = excluded.penalty_amount
            "#,
        )
        .bind(&settings.user_id)
        .bind(settings.agreement_start_date)
        .bind(settings.is_wagon_system_enabled)
        .bind(settings.is_penalty_system_enabled)
        .bind(settings.penalty_amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn upsert_profile(&mut self, profile: &Profile) -> Result<()> {
        self.write(Table::Profiles)?;

        let allowed = serde_json::to_string(&profile.allowed_workers)?;
        sqlx::query(
            r#"
            INSERT INTO profiles (id, allowed_workers) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET allowed_workers = excluded.allowed_workers
            "#,
        )
        .bind(&profile.id)
        .bind(allowed)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Remove every mirrored row scoped to `user_id`
    pub async fn clear_mirror(&mut self, user_id: &str) -> Result<()> {
        for table in Table::MIRRORED {
            self.write(table)?;
        }

        // Earnings first so the entry foreign key never dangles
        for statement in [
            "DELETE FROM daily_earnings WHERE user_id = ?",
            "DELETE FROM daily_entries WHERE user_id = ?",
            "DELETE FROM agreements WHERE user_id = ?",
            "DELETE FROM workers WHERE user_id = ?",
            "DELETE FROM settings WHERE user_id = ?",
            "DELETE FROM profiles WHERE id = ?",
        ] {
            sqlx::query(statement)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(())
    }

    // ===== Session =====

    pub async fn save_session(
        &mut self,
        user_id: &str,
        email: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<()> {
        self.write(Table::OfflineSession)?;

        // Only one session is kept
        sqlx::query("DELETE FROM offline_session")
            .execute(&mut *self.tx)
            .await?;

        sqlx::query(
            "INSERT INTO offline_session (user_id, email, access_token, saved_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(email)
        .bind(access_token)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn clear_session(&mut self) -> Result<()> {
        self.write(Table::OfflineSession)?;

        sqlx::query("DELETE FROM offline_session")
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    /// Number of queued mutations, as seen by this transaction
    pub async fn queued_mutations(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }
}
