//! Integration tests for Tonnage Ledger
//!
//! These tests verify end-to-end functionality including:
//! - Offline entry recording and the upload that follows reconnection
//! - Sync pass ordering, halting and retry
//! - Reports reading the local mirror and the remote store alike
//! - Persistence of queued changes across restarts

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tonnage_ledger::app::AppState;
use tonnage_ledger::database::{
    create_pool, Agreement, AgreementName, AllowanceType, DayType, Repository, Table, UserSettings,
};
use tonnage_ledger::notify::Notifier;
use tonnage_ledger::payroll::PayPeriod;
use tonnage_ledger::services::{
    DailyEntryService, ReportSource, ReportsService, RosterService, SubmitEntry,
};
use tonnage_ledger::sync::{
    ConnectivityMonitor, MemoryRemote, MutationQueue, RemoteTable, SyncEngine,
};

const USER: &str = "user-1";

struct Client {
    repo: Repository,
    remote: Arc<MemoryRemote>,
    connectivity: ConnectivityMonitor,
    engine: SyncEngine,
    entries: DailyEntryService,
    roster: RosterService,
    reports: ReportsService,
    queue: MutationQueue,
    _temp: TempDir,
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Helper to create an offline client on a file database with a saved session
async fn create_test_client() -> Client {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let pool = create_pool(&db_path).await.unwrap();
    let repo = Repository::new(pool);

    let mut tx = repo.begin(&[Table::OfflineSession]).await.unwrap();
    tx.save_session(USER, Some("crew@example.com"), None)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let remote = Arc::new(MemoryRemote::new());
    let connectivity = ConnectivityMonitor::new(false);
    let notifier = Notifier::new();
    let engine = SyncEngine::new(
        repo.clone(),
        remote.clone(),
        connectivity.clone(),
        notifier.clone(),
    );

    Client {
        entries: DailyEntryService::new(repo.clone(), notifier.clone(), engine.clone()),
        roster: RosterService::new(repo.clone(), notifier, engine.clone()),
        reports: ReportsService::new(repo.clone(), engine.clone()),
        queue: MutationQueue::new(repo.clone()),
        repo,
        remote,
        connectivity,
        engine,
        _temp: temp_dir,
    }
}

/// Roster, current agreement and settings, all saved while offline
async fn set_up_payroll(client: &Client) {
    client
        .roster
        .save_workers(USER, vec!["Ali".to_string(), "Bilal".to_string()])
        .await
        .unwrap();
    client
        .roster
        .save_agreement(Agreement {
            user_id: USER.to_string(),
            agreement_name: AgreementName::Current,
            ton_rate: 100.0,
            rest_rate: 80.0,
            layoff_rate: 50.0,
            wagon_rate: 0.0,
            monthly_allowance: 3000.0,
            allowance_calculation_type: AllowanceType::Normal,
            paid_leaves: 10,
            without_paid_leaves: 5,
            paid_leave_rate: 100.0,
        })
        .await
        .unwrap();

    let mut settings = UserSettings::new(USER);
    settings.agreement_start_date = Some(date("2024-01-01"));
    client.roster.save_settings(settings).await.unwrap();
}

fn work_day(day: &str, tonnage: f64) -> SubmitEntry {
    SubmitEntry {
        user_id: USER.to_string(),
        entry_date: date(day),
        day_type: DayType::WorkDay,
        tonnage: Some(tonnage),
        wagons: 0,
        absent: Vec::new(),
    }
}

#[tokio::test]
async fn test_offline_entry_uploads_once_after_reconnect() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;

    let submission = client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();
    assert!(submission.sync.is_none());
    assert_eq!(client.remote.write_count(), 0);

    let local = client.repo.get_entry(USER, date("2024-03-04")).await.unwrap().unwrap();
    assert!(!local.synced);

    client.connectivity.set_online(true);
    let report = client.engine.sync_now().await.unwrap();

    assert_eq!(report.pushed, 4);
    assert!(report.halted_on.is_none());
    assert!(report.pulled);
    assert_eq!(client.remote.inserted_rows(RemoteTable::DailyEntries).await, 1);
    assert_eq!(client.remote.inserted_rows(RemoteTable::DailyEarnings).await, 2);
    assert_eq!(client.queue.pending_count().await.unwrap(), 0);

    let local = client.repo.get_entry(USER, date("2024-03-04")).await.unwrap().unwrap();
    assert!(local.synced);
    assert!(local.remote_id.is_some());
    assert_eq!(client.repo.count_unsynced(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_pass_with_empty_queue_writes_nothing() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;
    client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();

    client.connectivity.set_online(true);
    client.engine.sync_now().await.unwrap();
    let writes = client.remote.write_count();

    let report = client.engine.sync_now().await.unwrap();
    assert_eq!(report.pushed, 0);
    assert_eq!(client.remote.write_count(), writes);
    assert!(client.engine.last_sync().is_some());
}

#[tokio::test]
async fn test_failed_upload_halts_and_is_retried_in_order() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;
    client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();
    client.entries.submit(work_day("2024-03-05", 3.0)).await.unwrap();

    client
        .remote
        .reject_writes(RemoteTable::DailyEntries, true)
        .await;
    client.connectivity.set_online(true);

    let report = client.engine.sync_now().await.unwrap();
    assert_eq!(report.pushed, 3);
    assert!(report.halted_on.is_some());
    assert!(!report.pulled);
    assert_eq!(client.queue.pending_count().await.unwrap(), 2);
    assert_eq!(client.repo.count_unsynced(USER).await.unwrap(), 2);

    client
        .remote
        .reject_writes(RemoteTable::DailyEntries, false)
        .await;
    let report = client.engine.sync_now().await.unwrap();

    assert_eq!(report.pushed, 2);
    assert!(report.pulled);
    assert_eq!(client.remote.rows(RemoteTable::DailyEntries).await.len(), 2);
    assert_eq!(client.repo.count_unsynced(USER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_resubmitted_day_leaves_one_remote_entry() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;

    client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();
    client.entries.submit(work_day("2024-03-04", 5.0)).await.unwrap();

    client.connectivity.set_online(true);
    client.engine.sync_now().await.unwrap();

    let rows = client.remote.rows(RemoteTable::DailyEntries).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["tonnage"], serde_json::json!(5.0));

    let entries = client.repo.list_entries(USER).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tonnage, Some(5.0));
    assert!(entries[0].synced);
}

#[tokio::test]
async fn test_remote_reports_fail_fast_offline() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;

    let period = PayPeriod::current(date("2024-03-10"));
    let result = client.reports.salary(USER, period, ReportSource::Remote).await;

    assert!(result.is_err());
    assert_eq!(client.remote.write_count(), 0);
}

#[tokio::test]
async fn test_local_and_remote_reports_agree_after_sync() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;
    client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();
    client.entries.submit(work_day("2024-03-05", 4.0)).await.unwrap();

    client.connectivity.set_online(true);
    client.engine.sync_now().await.unwrap();

    let period = PayPeriod::current(date("2024-03-10"));
    let local = client
        .reports
        .salary(USER, period, ReportSource::Local)
        .await
        .unwrap();
    let remote = client
        .reports
        .salary(USER, period, ReportSource::Remote)
        .await
        .unwrap();

    assert_eq!(local, remote);
    assert_eq!(local.entry_count, 2);
    // 2 tons and 4 tons shared by two workers, plus half of the monthly allowance
    assert_eq!(local.rows[0].worker_name, "Ali");
    assert_eq!(local.rows[0].work_earning, 300.0);
    assert_eq!(local.rows[0].total_salary, 1800.0);
}

#[tokio::test]
async fn test_reconnect_triggers_debounced_sync() {
    let client = create_test_client().await;
    set_up_payroll(&client).await;
    client.entries.submit(work_day("2024-03-04", 2.0)).await.unwrap();

    let auto_sync = client.engine.spawn_auto_sync(Duration::from_millis(50));
    client.connectivity.set_online(true);

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while client.queue.pending_count().await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    auto_sync.abort();
    assert!(drained.is_ok());
    assert_eq!(client.remote.inserted_rows(RemoteTable::DailyEntries).await, 1);
}

#[tokio::test]
async fn test_queued_changes_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let state = AppState::open(temp_dir.path(), true).await.unwrap();
        let mut tx = state.repo.begin(&[Table::OfflineSession]).await.unwrap();
        tx.save_session(USER, None, None).await.unwrap();
        tx.commit().await.unwrap();

        state
            .roster
            .save_workers(USER, vec!["Ali".to_string()])
            .await
            .unwrap();
    }

    let state = AppState::open(temp_dir.path(), true).await.unwrap();
    let session = state.require_session().await.unwrap();

    assert_eq!(session.user_id, USER);
    assert_eq!(
        MutationQueue::new(state.repo.clone()).pending_count().await.unwrap(),
        1
    );
    assert_eq!(state.roster.list_workers(USER).await.unwrap(), vec!["Ali"]);
}
