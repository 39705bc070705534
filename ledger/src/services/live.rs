//! Current pay period view
//!
//! Keeps a summary of the current pay period's entries up to date by
//! recomputing it whenever the entry or earning tables change.

use crate::database::{AttendanceStatus, Repository, Table};
use crate::error::Result;
use crate::payroll::PayPeriod;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// One row of the current period table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub entry_date: NaiveDate,
    /// Tonnage, or "Rest Day"
    pub tonnage: String,
    /// Absent worker names, or "None"
    pub absent: String,
    pub pay_per_worker: f64,
    pub synced: bool,
}

/// Entries of the pay period containing `today`, newest first
pub async fn current_period_summaries(
    repo: &Repository,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<EntrySummary>> {
    let period = PayPeriod::current(today);
    let entries = repo.entries_between(user_id, period.start, period.end).await?;

    let mut summaries = Vec::with_capacity(entries.len());
    for entry in entries.into_iter().rev() {
        let earnings = repo.earnings_for_entry(entry.local_id).await?;

        let absent: Vec<&str> = earnings
            .iter()
            .filter(|e| e.attendance_status == AttendanceStatus::Absent)
            .map(|e| e.worker_name.as_str())
            .collect();
        let pay_per_worker = earnings
            .iter()
            .find(|e| e.attendance_status == AttendanceStatus::Present)
            .map(|e| e.earning)
            .unwrap_or(0.0);

        summaries.push(EntrySummary {
            entry_date: entry.entry_date,
            tonnage: match entry.tonnage {
                Some(t) if !entry.day_type.is_rest() => t.to_string(),
                _ => "Rest Day".to_string(),
            },
            absent: if absent.is_empty() {
                "None".to_string()
            } else {
                absent.join(", ")
            },
            pay_per_worker,
            synced: entry.synced,
        });
    }

    Ok(summaries)
}

/// Live summary of the current pay period
pub struct CurrentPeriodView {
    rx: watch::Receiver<Vec<EntrySummary>>,
    task: JoinHandle<()>,
}

impl CurrentPeriodView {
    /// Compute the view once and keep it fresh in the background.
    ///
    /// `today` is asked again on every recompute so the view follows period
    /// boundaries.
    pub async fn spawn<F>(repo: Repository, user_id: String, today: F) -> Result<Self>
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        // Subscribe first so no change between load and spawn is missed
        let mut changes = repo.subscribe();
        let initial = current_period_summaries(&repo, &user_id, today()).await?;
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if !matches!(change.table, Table::DailyEntries | Table::DailyEarnings) {
                            continue;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Change feed lagged by {}, recomputing", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match current_period_summaries(&repo, &user_id, today()).await {
                    Ok(summaries) => {
                        tx.send_replace(summaries);
                    }
                    Err(e) => tracing::warn!("Failed to refresh current period view: {}", e),
                }
            }
        });

        Ok(Self { rx, task })
    }

    pub fn current(&self) -> Vec<EntrySummary> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<EntrySummary>> {
        self.rx.clone()
    }
}

impl Drop for CurrentPeriodView {
    fn drop(&mut self) {
        self.task.abort();
    }
}
