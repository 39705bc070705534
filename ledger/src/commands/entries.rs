//! Daily entry and status commands

use super::{finish_sync, today};
use crate::app::AppState;
use crate::database::DayType;
use crate::error::Result;
use crate::payroll::{format_money, PayPeriod};
use crate::services::{current_period_summaries, EntrySummary, SubmitEntry};
use crate::sync::MutationQueue;
use chrono::NaiveDate;

pub async fn record(
    state: &AppState,
    entry_date: NaiveDate,
    day_type: DayType,
    tonnage: Option<f64>,
    wagons: i64,
    absent: Vec<String>,
) -> Result<()> {
    let session = state.require_session().await?;

    let submission = state
        .entries
        .submit(SubmitEntry {
            user_id: session.user_id,
            entry_date,
            day_type,
            tonnage,
            wagons,
            absent,
        })
        .await?;

    println!("{} on {} saved:", day_type, entry_date);
    for earning in &submission.earnings {
        println!(
            "  {:<20} {:<12} {:>10}",
            earning.worker_name,
            earning.attendance_status.to_string(),
            format_money(earning.earning)
        );
    }

    finish_sync(submission.sync).await
}

pub async fn status(state: &AppState) -> Result<()> {
    let session = state.require_session().await?;

    let pending = MutationQueue::new(state.repo.clone()).pending_count().await?;
    let unsynced = state.repo.count_unsynced(&session.user_id).await?;

    println!("User:        {}", session.user_id);
    println!(
        "Connection:  {}",
        if state.connectivity.is_online() {
            "online"
        } else {
            "offline"
        }
    );
    println!("Queued:      {} change(s)", pending);
    println!("Unsynced:    {} entr(ies)", unsynced);
    println!();

    let today = today();
    println!("{}", PayPeriod::current(today).label());
    print_summaries(&current_period_summaries(&state.repo, &session.user_id, today).await?);
    Ok(())
}

pub(crate) fn print_summaries(summaries: &[EntrySummary]) {
    if summaries.is_empty() {
        println!("  No entries yet.");
        return;
    }

    println!(
        "  {:<12} {:>10} {:<30} {:>12} {}",
        "Date", "Tonnage", "Absent", "Pay/worker", ""
    );
    for row in summaries {
        println!(
            "  {:<12} {:>10} {:<30} {:>12} {}",
            row.entry_date.to_string(),
            row.tonnage,
            row.absent,
            format_money(row.pay_per_worker),
            if row.synced { "" } else { "(pending)" }
        );
    }
}
