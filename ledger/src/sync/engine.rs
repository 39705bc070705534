//! Sync engine
//!
//! Replays the mutation queue against the remote store, one operation at a
//! time and in queue order, and refreshes the local mirror from the remote
//! snapshot after a successful push.
//!
//! State machine: `Idle -> Syncing -> Idle`. A failed replay halts the pass;
//! the failed operation and everything after it stay queued for the next
//! trigger. Triggers that arrive while a pass is running are dropped.

use super::connectivity::ConnectivityMonitor;
use super::mutation::Mutation;
use super::queue::{MutationQueue, QueuedMutation};
use super::remote::{Filter, OnlineOnly, RemoteError, RemoteStore, RemoteTable};
use super::rows::{RemoteDailyEarning, RemoteDailyEntry, RemoteSnapshot};
use crate::database::{Repository, StoreTx, Table};
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle of a sync pass running in the background
pub type SyncHandle = JoinHandle<Result<SyncReport>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Operations replayed and acknowledged
    pub pushed: usize,
    /// Queue id of the operation the pass stopped at
    pub halted_on: Option<i64>,
    /// Whether the local mirror was replaced from the remote snapshot
    pub pulled: bool,
    /// The pass did not run (offline or another pass in flight)
    pub skipped: bool,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    repo: Repository,
    queue: MutationQueue,
    remote: OnlineOnly,
    connectivity: ConnectivityMonitor,
    notifier: Notifier,
    syncing: AtomicBool,
    state: watch::Sender<SyncState>,
    last_sync: watch::Sender<Option<DateTime<Utc>>>,
}

/// Holds the in-flight flag for the duration of a pass
struct PassGuard<'a> {
    inner: &'a EngineInner,
}

impl<'a> PassGuard<'a> {
    fn try_enter(inner: &'a EngineInner) -> Option<Self> {
        inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        inner.state.send_replace(SyncState::Syncing);
        Some(Self { inner })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.send_replace(SyncState::Idle);
        self.inner.syncing.store(false, Ordering::Release);
    }
}

/// Map a failed remote write to the error surfaced for `operation`
fn remote_write(operation: &str) -> impl FnOnce(RemoteError) -> AppError + '_ {
    move |source| match source {
        RemoteError::Offline => AppError::Offline,
        source => AppError::RemoteWrite {
            operation: operation.to_string(),
            source,
        },
    }
}

impl SyncEngine {
    pub fn new(
        repo: Repository,
        remote: Arc<dyn RemoteStore>,
        connectivity: ConnectivityMonitor,
        notifier: Notifier,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        let (last_sync, _) = watch::channel(None);

        Self {
            inner: Arc::new(EngineInner {
                queue: MutationQueue::new(repo.clone()),
                repo,
                remote: OnlineOnly::new(remote, connectivity.clone()),
                connectivity,
                notifier,
                syncing: AtomicBool::new(false),
                state,
                last_sync,
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Completion time of the last pass that ended without a failure
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_sync.borrow()
    }

    pub fn subscribe_last_sync(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.last_sync.subscribe()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    /// Connectivity-gated view of the remote store
    pub fn remote(&self) -> &dyn RemoteStore {
        &self.inner.remote
    }

    /// Run one pass now. A no-op while offline or while another pass runs.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        if !self.inner.connectivity.is_online() {
            tracing::debug!("Offline, sync skipped");
            return Ok(SyncReport::skipped());
        }

        let Some(_guard) = PassGuard::try_enter(&self.inner) else {
            tracing::debug!("Sync already in progress, trigger dropped");
            return Ok(SyncReport::skipped());
        };

        let result = self.run_pass().await;
        if let Err(e) = &result {
            self.inner.notifier.report(e);
        }
        result
    }

    /// Start a background pass if online; used after local writes
    pub fn request_sync(&self) -> Option<SyncHandle> {
        if !self.inner.connectivity.is_online() {
            return None;
        }

        let engine = self.clone();
        Some(tokio::spawn(async move { engine.sync_now().await }))
    }

    /// Replace the local mirror for `user_id` with the remote snapshot.
    ///
    /// Returns false when the refresh was skipped because local changes are
    /// still queued or a sync pass is running.
    pub async fn full_resync(&self, user_id: &str) -> Result<bool> {
        let Some(_guard) = PassGuard::try_enter(&self.inner) else {
            tracing::debug!("Sync in progress, resync skipped");
            return Ok(false);
        };

        let result = self.pull(user_id).await;
        match &result {
            Ok(true) => {
                self.inner.last_sync.send_replace(Some(Utc::now()));
            }
            Ok(false) => {}
            Err(e) => self.inner.notifier.report(e),
        }
        result
    }

    /// Sync after every transition to online, once connectivity held for `debounce`
    pub fn spawn_auto_sync(&self, debounce: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        let mut online = self.inner.connectivity.subscribe();

        tokio::spawn(async move {
            tracing::info!("Starting automatic sync (debounce {:?})", debounce);

            loop {
                let is_online = *online.borrow_and_update();

                if is_online {
                    tokio::select! {
                        _ = tokio::time::sleep(debounce) => {
                            if let Err(e) = engine.sync_now().await {
                                tracing::error!("Automatic sync failed: {}", e);
                            }
                            if online.changed().await.is_err() {
                                break;
                            }
                        }
                        changed = online.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            tracing::debug!("Connectivity changed during debounce, sync postponed");
                        }
                    }
                } else if online.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn run_pass(&self) -> Result<SyncReport> {
        let inner = &self.inner;
        let mut report = SyncReport::default();

        let pending = inner.queue.pending_count().await?;
        if pending == 0 {
            tracing::debug!("Mutation queue empty, nothing to upload");
            inner.last_sync.send_replace(Some(Utc::now()));
            return Ok(report);
        }

        tracing::info!("Sync pass started with {} queued operations", pending);
        inner.notifier.info("Uploading offline changes...");

        let mut pushed_for = None;
        let mut drain = inner.queue.drain();

        while let Some(op) = drain.next().await? {
            match self.replay(&op).await {
                Ok(()) => {
                    report.pushed += 1;
                    pushed_for = Some(op.mutation.user_id().to_string());
                }
                Err(e) => {
                    tracing::error!("Operation {} could not be synced: {}", op.id, e);
                    inner
                        .notifier
                        .error(format!("Failed to upload {}.", op.mutation.describe()));
                    report.halted_on = Some(op.id);
                    break;
                }
            }
        }

        if report.halted_on.is_some() {
            tracing::warn!(
                "Sync pass halted after {} operations; the rest stays queued",
                report.pushed
            );
            return Ok(report);
        }

        let user_id = match inner.repo.load_session().await? {
            Some(session) => Some(session.user_id),
            None => pushed_for,
        };

        if let Some(user_id) = user_id {
            match self.pull(&user_id).await {
                Ok(pulled) => report.pulled = pulled,
                Err(e) => inner.notifier.report(&e),
            }
        }

        inner.last_sync.send_replace(Some(Utc::now()));
        tracing::info!("Sync pass finished: {} pushed, pulled: {}", report.pushed, report.pulled);

        Ok(report)
    }

    /// Replay one queued operation; last writer wins by logical key
    async fn replay(&self, op: &QueuedMutation) -> Result<()> {
        let remote = &self.inner.remote;
        let operation = op.mutation.describe();

        match &op.mutation {
            Mutation::CreateDailyEntry {
                entry_local_id,
                entry,
                earnings,
            } => {
                remote
                    .delete_matching(
                        RemoteTable::DailyEntries,
                        &[
                            Filter::eq("user_id", &entry.user_id),
                            Filter::eq("entry_date", entry.entry_date),
                        ],
                    )
                    .await
                    .map_err(remote_write(&operation))?;

                let remote_id = remote
                    .insert_returning_id(RemoteTable::DailyEntries, serde_json::to_value(entry)?)
                    .await
                    .map_err(remote_write(&operation))?;

                let rows = earnings
                    .iter()
                    .map(|e| RemoteDailyEarning::new_row(remote_id, &entry.user_id, e))
                    .collect();
                remote
                    .bulk_insert(RemoteTable::DailyEarnings, rows)
                    .await
                    .map_err(remote_write(&operation))?;

                let mut tx = self
                    .inner
                    .repo
                    .begin(&[Table::DailyEntries, Table::SyncQueue])
                    .await?;
                let marked = tx.mark_entry_synced(*entry_local_id, remote_id).await?;
                MutationQueue::acknowledge_in(&mut tx, op.id).await?;
                tx.commit().await?;

                if !marked {
                    tracing::debug!(
                        "Local entry {} was superseded before upload; its replacement is still queued",
                        entry_local_id
                    );
                }

                self.inner
                    .notifier
                    .success(format!("Entry for {} uploaded successfully!", entry.entry_date));
                return Ok(());
            }
            Mutation::ReplaceWorkers { user_id, workers } => {
                remote
                    .delete_matching(RemoteTable::Workers, &[Filter::eq("user_id", user_id)])
                    .await
                    .map_err(remote_write(&operation))?;

                let rows = workers
                    .iter()
                    .map(|name| json!({ "user_id": user_id, "worker_name": name }))
                    .collect();
                remote
                    .bulk_insert(RemoteTable::Workers, rows)
                    .await
                    .map_err(remote_write(&operation))?;
            }
            Mutation::UpsertAgreement { agreement } => {
                remote
                    .delete_matching(
                        RemoteTable::Agreements,
                        &[
                            Filter::eq("user_id", &agreement.user_id),
                            Filter::eq("agreement_name", agreement.agreement_name.as_str()),
                        ],
                    )
                    .await
                    .map_err(remote_write(&operation))?;

                remote
                    .bulk_insert(RemoteTable::Agreements, vec![serde_json::to_value(agreement)?])
                    .await
                    .map_err(remote_write(&operation))?;
            }
            Mutation::UpsertSettings { settings } => {
                remote
                    .delete_matching(RemoteTable::Settings, &[Filter::eq("user_id", &settings.user_id)])
                    .await
                    .map_err(remote_write(&operation))?;

                remote
                    .bulk_insert(RemoteTable::Settings, vec![serde_json::to_value(settings)?])
                    .await
                    .map_err(remote_write(&operation))?;
            }
        }

        self.inner.queue.acknowledge(op.id).await?;
        tracing::info!("Uploaded {}", operation);
        Ok(())
    }

    /// Destructive refresh of every mirrored table for `user_id`
    async fn pull(&self, user_id: &str) -> Result<bool> {
        let snapshot = RemoteSnapshot::fetch(&self.inner.remote, user_id).await?;

        let mut tx = self.inner.repo.begin(&Table::MIRRORED).await?;

        let queued = tx.queued_mutations().await?;
        if queued > 0 {
            tx.rollback().await?;
            self.inner.notifier.warning(format!(
                "Refresh from server skipped: {} local changes are still waiting to upload.",
                queued
            ));
            return Ok(false);
        }

        tx.clear_mirror(user_id).await?;
        replace_mirror(&mut tx, &snapshot).await?;
        tx.commit().await?;

        tracing::info!("Local mirror for {} replaced from remote snapshot", user_id);
        Ok(true)
    }
}

async fn replace_mirror(tx: &mut StoreTx, snapshot: &RemoteSnapshot) -> Result<()> {
    // One entry per date; a later remote id wins
    let mut by_date: BTreeMap<NaiveDate, &RemoteDailyEntry> = BTreeMap::new();
    for entry in &snapshot.entries {
        match by_date.get(&entry.entry_date) {
            Some(existing) if existing.id > entry.id => {
                tracing::warn!("Ignoring stale remote entry {} for {}", entry.id, entry.entry_date);
            }
            _ => {
                by_date.insert(entry.entry_date, entry);
            }
        }
    }

    let mut local_ids: HashMap<i64, i64> = HashMap::new();
    for entry in by_date.values() {
        let local_id = tx.insert_entry(&entry.draft(), Some(entry.id), true).await?;
        local_ids.insert(entry.id, local_id);
    }

    for earning in &snapshot.earnings {
        match local_ids.get(&earning.entry_id) {
            Some(&local_id) => {
                tx.insert_earning(local_id, &earning.user_id, Some(earning.id), &earning.draft())
                    .await?;
            }
            None => tracing::warn!(
                "Remote earning {} references unknown entry {}",
                earning.id,
                earning.entry_id
            ),
        }
    }

    let names: Vec<String> = snapshot
        .workers
        .iter()
        .map(|w| w.worker_name.clone())
        .collect();
    tx.replace_workers(&snapshot.user_id, &names).await?;

    for agreement in &snapshot.agreements {
        tx.upsert_agreement(agreement).await?;
    }
    if let Some(settings) = &snapshot.settings {
        tx.upsert_settings(settings).await?;
    }
    if let Some(profile) = &snapshot.profile {
        tx.upsert_profile(profile).await?;
    }

    Ok(())
}
