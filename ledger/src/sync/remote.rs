//! Remote store contract
//!
//! The remote relational store is reached only through [`RemoteStore`]:
//! paged filtered selects, delete-by-match, insert-returning-id and bulk insert,
//! all over JSON rows. [`OnlineOnly`] gates every call on connectivity.

use super::connectivity::ConnectivityMonitor;
use crate::config::REMOTE_PAGE_SIZE;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Tables exposed by the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteTable {
    Settings,
    Workers,
    Agreements,
    DailyEntries,
    DailyEarnings,
    Profiles,
}

impl RemoteTable {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteTable::Settings => "settings",
            RemoteTable::Workers => "workers",
            RemoteTable::Agreements => "agreements",
            RemoteTable::DailyEntries => "daily_entries",
            RemoteTable::DailyEarnings => "daily_earnings",
            RemoteTable::Profiles => "profiles",
        }
    }
}

impl fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Gte,
    Lte,
}

impl Condition {
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Gte => "gte",
            Condition::Lte => "lte",
        }
    }
}

/// Column filter; values are compared in their textual form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub condition: Condition,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self::new(column, Condition::Eq, value)
    }

    pub fn gte(column: &str, value: impl ToString) -> Self {
        Self::new(column, Condition::Gte, value)
    }

    pub fn lte(column: &str, value: impl ToString) -> Self {
        Self::new(column, Condition::Lte, value)
    }

    fn new(column: &str, condition: Condition, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            condition,
            value: value.to_string(),
        }
    }

    /// Whether a JSON row satisfies this filter
    pub fn matches(&self, row: &Value) -> bool {
        let Some(field) = row.get(&self.column) else {
            return false;
        };

        let actual = match field {
            Value::String(s) => s.clone(),
            Value::Null => return false,
            other => other.to_string(),
        };

        // Numbers compare numerically, everything else (ISO dates included) lexically
        let ordering = match (actual.parse::<f64>(), self.value.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(actual.as_str().cmp(self.value.as_str())),
        };

        match (self.condition, ordering) {
            (Condition::Eq, Some(o)) => o.is_eq(),
            (Condition::Gte, Some(o)) => o.is_ge(),
            (Condition::Lte, Some(o)) => o.is_le(),
            (_, None) => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("network is offline")]
    Offline,

    #[error("remote returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Request/response contract of the remote relational store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Up to `limit` matching rows of `table`, starting at `offset` in id order.
    /// A store may return fewer rows than asked for before the end.
    async fn select_page(
        &self,
        table: RemoteTable,
        filters: &[Filter],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError>;

    /// Every row of `table` matching every filter, fetched page by page
    async fn select(&self, table: RemoteTable, filters: &[Filter]) -> Result<Vec<Value>, RemoteError> {
        let mut rows = Vec::new();
        loop {
            let page = self
                .select_page(table, filters, rows.len(), REMOTE_PAGE_SIZE)
                .await?;
            // A server row cap can cut pages short, so only an empty page ends the scan
            if page.is_empty() {
                return Ok(rows);
            }
            rows.extend(page);
        }
    }

    /// Delete every row of `table` matching every filter
    async fn delete_matching(&self, table: RemoteTable, filters: &[Filter]) -> Result<(), RemoteError>;

    /// Insert one row and return the identifier the store assigned to it
    async fn insert_returning_id(&self, table: RemoteTable, row: Value) -> Result<i64, RemoteError>;

    async fn bulk_insert(&self, table: RemoteTable, rows: Vec<Value>) -> Result<(), RemoteError>;
}

/// Fails every call with [`RemoteError::Offline`] while the monitor reports offline
pub struct OnlineOnly {
    inner: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
}

impl OnlineOnly {
    pub fn new(inner: Arc<dyn RemoteStore>, connectivity: ConnectivityMonitor) -> Self {
        Self {
            inner,
            connectivity,
        }
    }
}

#[async_trait]
impl RemoteStore for OnlineOnly {
    async fn select_page(
        &self,
        table: RemoteTable,
        filters: &[Filter],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        self.connectivity.ensure_online()?;
        self.inner.select_page(table, filters, offset, limit).await
    }

    async fn delete_matching(&self, table: RemoteTable, filters: &[Filter]) -> Result<(), RemoteError> {
        self.connectivity.ensure_online()?;
        self.inner.delete_matching(table, filters).await
    }

    async fn insert_returning_id(&self, table: RemoteTable, row: Value) -> Result<i64, RemoteError> {
        self.connectivity.ensure_online()?;
        self.inner.insert_returning_id(table, row).await
    }

    async fn bulk_insert(&self, table: RemoteTable, rows: Vec<Value>) -> Result<(), RemoteError> {
        self.connectivity.ensure_online()?;
        self.inner.bulk_insert(table, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemoryRemote;
    use serde_json::json;

    #[test]
    fn test_filter_matches_dates_and_numbers() {
        let row = json!({"user_id": "u1", "entry_date": "2024-03-10", "tonnage": 12.5});

        assert!(Filter::eq("user_id", "u1").matches(&row));
        assert!(Filter::gte("entry_date", "2024-03-01").matches(&row));
        assert!(Filter::lte("entry_date", "2024-03-10").matches(&row));
        assert!(!Filter::lte("entry_date", "2024-03-09").matches(&row));
        assert!(Filter::gte("tonnage", 9).matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }

    #[tokio::test]
    async fn test_online_only_fails_fast_when_offline() {
        let memory = Arc::new(MemoryRemote::new());
        let connectivity = ConnectivityMonitor::new(false);
        let remote = OnlineOnly::new(memory.clone(), connectivity.clone());

        let err = remote
            .bulk_insert(RemoteTable::Workers, vec![json!({"user_id": "u1", "worker_name": "Ali"})])
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Offline);
        assert_eq!(memory.write_count(), 0);

        connectivity.set_online(true);
        remote
            .bulk_insert(RemoteTable::Workers, vec![json!({"user_id": "u1", "worker_name": "Ali"})])
            .await
            .unwrap();
        assert_eq!(memory.write_count(), 1);
    }
}
