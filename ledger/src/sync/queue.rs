//! Durable mutation queue
//!
//! Rows of `sync_queue` are appended in the same store transaction as the
//! domain write they describe and removed only after the remote store
//! confirmed the replay. Queue order (timestamp, then id) is replay order.

use super::mutation::Mutation;
use crate::database::models::QueueRow;
use crate::database::{Repository, StoreTx, Table};
use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// A queued mutation as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMutation {
    pub id: i64,
    pub mutation: Mutation,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<QueueRow> for QueuedMutation {
    type Error = AppError;

    fn try_from(row: QueueRow) -> Result<Self> {
        let mutation: Mutation = serde_json::from_str(&row.payload)?;
        if mutation.kind() != row.kind {
            return Err(AppError::Generic(format!(
                "Queued operation {} has type '{}' but carries a '{}' payload",
                row.id,
                row.kind,
                mutation.kind()
            )));
        }

        Ok(Self {
            id: row.id,
            mutation,
            timestamp: row.timestamp,
        })
    }
}

/// Fixed-width text form so lexical order equals time order
fn stored_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Clone)]
pub struct MutationQueue {
    repo: Repository,
}

impl MutationQueue {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Append `mutation` inside `tx`; it becomes visible only if `tx` commits
    pub async fn enqueue(tx: &mut StoreTx, mutation: &Mutation) -> Result<i64> {
        tx.write(Table::SyncQueue)?;

        let payload = serde_json::to_string(mutation)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sync_queue (type, payload, timestamp) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(mutation.kind())
        .bind(payload)
        .bind(stored_timestamp(Utc::now()))
        .fetch_one(tx.conn())
        .await?;

        tracing::debug!("Queued {} as operation {}", mutation.kind(), id);
        Ok(id)
    }

    /// Lazy, finite walk over the queue in replay order.
    ///
    /// Each call starts from the head again, so an interrupted drain can
    /// simply be restarted.
    pub fn drain(&self) -> Drain {
        Drain {
            repo: self.repo.clone(),
            cursor: None,
        }
    }

    /// Remove an operation after its replay was confirmed
    pub async fn acknowledge(&self, id: i64) -> Result<()> {
        let mut tx = self.repo.begin(&[Table::SyncQueue]).await?;
        Self::acknowledge_in(&mut tx, id).await?;
        tx.commit().await
    }

    /// Remove an operation as part of a larger transaction
    pub async fn acknowledge_in(tx: &mut StoreTx, id: i64) -> Result<()> {
        tx.write(Table::SyncQueue)?;

        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id)
            .execute(tx.conn())
            .await?;

        tracing::debug!("Acknowledged operation {}", id);
        Ok(())
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(self.repo.pool())
            .await?;
        Ok(count)
    }

    /// Every pending operation in replay order
    pub async fn list(&self) -> Result<Vec<QueuedMutation>> {
        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT id, type, payload, timestamp FROM sync_queue ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(self.repo.pool())
        .await?;

        rows.into_iter().map(QueuedMutation::try_from).collect()
    }
}

/// Cursor returned by [`MutationQueue::drain`]
pub struct Drain {
    repo: Repository,
    cursor: Option<(String, i64)>,
}

impl Drain {
    /// Next operation after the last one returned, or `None` when the queue is exhausted
    pub async fn next(&mut self) -> Result<Option<QueuedMutation>> {
        let row = match &self.cursor {
            None => {
                sqlx::query_as::<_, QueueRow>(
                    r#"
                    SELECT id, type, payload, timestamp FROM sync_queue
                    ORDER BY timestamp ASC, id ASC
                    LIMIT 1
                    "#,
                )
                .fetch_optional(self.repo.pool())
                .await?
            }
            Some((timestamp, id)) => {
                sqlx::query_as::<_, QueueRow>(
                    r#"
                    SELECT id, type, payload, timestamp FROM sync_queue
                    WHERE timestamp > ? OR (timestamp = ? AND id > ?)
                    ORDER BY timestamp ASC, id ASC
                    LIMIT 1
                    "#,
                )
                .bind(timestamp)
                .bind(timestamp)
                .bind(id)
                .fetch_optional(self.repo.pool())
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };

        self.cursor = Some((stored_timestamp(row.timestamp), row.id));
        QueuedMutation::try_from(row).map(Some)
    }
}
