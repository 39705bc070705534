//! In-memory remote store
//!
//! Behaves like the hosted store for the operations the client uses:
//! identifiers are assigned on insert and deleting a daily entry cascades
//! to its earnings. Writes to a table can be rejected on demand, and a row
//! cap per select page stands in for a server's max-rows limit.

use super::remote::{Filter, RemoteError, RemoteStore, RemoteTable};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::Mutex;

pub struct MemoryRemote {
    tables: Mutex<HashMap<RemoteTable, Vec<Value>>>,
    rejected: Mutex<HashSet<RemoteTable>>,
    inserted: Mutex<HashMap<RemoteTable, usize>>,
    next_id: AtomicI64,
    writes: AtomicU64,
    page_cap: Option<usize>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            inserted: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            writes: AtomicU64::new(0),
            page_cap: None,
        }
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return at most `cap` rows per select page, whatever the caller asks for
    pub fn with_page_cap(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap);
        self
    }

    /// Reject (or stop rejecting) every write to `table`
    pub async fn reject_writes(&self, table: RemoteTable, reject: bool) {
        let mut rejected = self.rejected.lock().await;
        if reject {
            rejected.insert(table);
        } else {
            rejected.remove(&table);
        }
    }

    /// Current rows of `table`
    pub async fn rows(&self, table: RemoteTable) -> Vec<Value> {
        self.tables
            .lock()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Total rows ever inserted into `table`
    pub async fn inserted_rows(&self, table: RemoteTable) -> usize {
        self.inserted.lock().await.get(&table).copied().unwrap_or(0)
    }

    /// Number of successful write calls of any kind
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    async fn check_writable(&self, table: RemoteTable) -> Result<(), RemoteError> {
        if self.rejected.lock().await.contains(&table) {
            return Err(RemoteError::Rejected {
                status: 500,
                message: format!("writes to {} are rejected", table),
            });
        }
        Ok(())
    }

    /// Assign an identifier to rows that do not carry one. Text keys are
    /// kept as they are and report no numeric id.
    fn with_id(&self, mut row: Value) -> Result<(Option<i64>, Value), RemoteError> {
        let Value::Object(map) = &mut row else {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };

        let id = match map.get("id") {
            None | Some(Value::Null) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                map.insert("id".to_string(), Value::from(id));
                Some(id)
            }
            Some(existing) => existing.as_i64(),
        };

        Ok((id, row))
    }

    async fn insert_rows(&self, table: RemoteTable, rows: Vec<Value>) -> Result<Vec<Option<i64>>, RemoteError> {
        self.check_writable(table).await?;

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            prepared.push(self.with_id(row)?);
        }

        let ids = prepared.iter().map(|(id, _)| *id).collect();
        let count = prepared.len();

        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .extend(prepared.into_iter().map(|(_, row)| row));
        *self.inserted.lock().await.entry(table).or_default() += count;
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(ids)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select_page(
        &self,
        table: RemoteTable,
        filters: &[Filter],
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        let limit = self.page_cap.map_or(limit, |cap| limit.min(cap));

        let tables = self.tables.lock().await;
        let rows = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn delete_matching(&self, table: RemoteTable, filters: &[Filter]) -> Result<(), RemoteError> {
        self.check_writable(table).await?;

        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table).or_default();

        let (removed, kept): (Vec<Value>, Vec<Value>) = rows
            .drain(..)
            .partition(|row| filters.iter().all(|f| f.matches(row)));
        *rows = kept;

        // daily_earnings.entry_id references daily_entries.id with ON DELETE CASCADE
        if table == RemoteTable::DailyEntries && !removed.is_empty() {
            let removed_ids: HashSet<i64> = removed
                .iter()
                .filter_map(|row| row.get("id").and_then(Value::as_i64))
                .collect();
            if let Some(earnings) = tables.get_mut(&RemoteTable::DailyEarnings) {
                earnings.retain(|row| {
                    row.get("entry_id")
                        .and_then(Value::as_i64)
                        .map_or(true, |entry_id| !removed_ids.contains(&entry_id))
                });
            }
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn insert_returning_id(&self, table: RemoteTable, row: Value) -> Result<i64, RemoteError> {
        let ids = self.insert_rows(table, vec![row]).await?;
        ids.first()
            .copied()
            .flatten()
            .ok_or_else(|| RemoteError::Decode("insert returned no row".to_string()))
    }

    async fn bulk_insert(&self, table: RemoteTable, rows: Vec<Value>) -> Result<(), RemoteError> {
        self.insert_rows(table, rows).await?;
        Ok(())
    }
}
