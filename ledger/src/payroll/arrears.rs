//! Arrears
//!
//! What workers are owed had the new agreement applied from the agreement
//! start date: every recorded day is priced again under both agreements,
//! allowances are compared per half-month window and bonuses per completed
//! agreement year. Only positive differences count.

use super::bonus::{annual_bonus, bonus_agreement_for};
use super::earnings::{compute_daily_earnings, DayInput};
use super::periods::{agreement_years, allowance_for_period, half_month_windows};
use super::snapshot::{EntryRecord, PayrollSnapshot};
use crate::database::{Agreement, AgreementName, AttendanceStatus, UserSettings};
use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArrearsRow {
    pub worker_name: String,
    pub salary_arrears: f64,
    pub allowance_arrears: f64,
    pub bonus_arrears: f64,
    pub total_arrears: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrearsReport {
    pub from: NaiveDate,
    /// Exclusive
    pub as_of: NaiveDate,
    pub rows: Vec<ArrearsRow>,
}

/// Price a recorded day again under `agreement`, per worker
fn reprice(
    entry: &EntryRecord,
    agreement: &Agreement,
    settings: &UserSettings,
) -> HashMap<String, f64> {
    let present = entry.present_workers();
    let absent = entry.absent_workers();
    // Penalised absences were stored with no pay
    let red_flagged: Vec<String> = entry
        .earnings
        .iter()
        .filter(|e| e.attendance_status == AttendanceStatus::Absent && e.earning <= 0.0)
        .map(|e| e.worker_name.clone())
        .collect();

    let input = DayInput {
        day_type: entry.day_type,
        tonnage: entry.tonnage,
        wagons: entry.wagons,
        present: &present,
        absent: &absent,
        red_flagged: &red_flagged,
    };

    compute_daily_earnings(&input, agreement, settings)
        .into_iter()
        .map(|e| (e.worker_name, e.earning))
        .collect()
}

/// Work earnings per worker over `entries`, priced under `agreement`
fn repriced_totals<'a>(
    entries: impl Iterator<Item = &'a EntryRecord>,
    agreement: &Agreement,
    settings: &UserSettings,
) -> HashMap<String, f64> {
    let mut totals = HashMap::new();
    for entry in entries {
        for (name, pay) in reprice(entry, agreement, settings) {
            *totals.entry(name).or_insert(0.0) += pay;
        }
    }
    totals
}

/// Arrears per visible roster worker for days before `as_of`
pub fn arrears_report(snapshot: &PayrollSnapshot, as_of: NaiveDate) -> Result<ArrearsReport> {
    snapshot.require_roster()?;
    let anchor = snapshot.anchor()?;
    let settings = snapshot.require_settings()?;
    let old = snapshot.require_agreement(AgreementName::Current)?;
    let new = snapshot.require_agreement(AgreementName::New)?;

    let mut rows: Vec<ArrearsRow> = snapshot
        .workers
        .iter()
        .map(|name| ArrearsRow {
            worker_name: name.clone(),
            ..ArrearsRow::default()
        })
        .collect();
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.worker_name.clone(), i))
        .collect();

    // Salary
    for entry in snapshot
        .entries
        .iter()
        .filter(|e| anchor <= e.entry_date && e.entry_date < as_of)
    {
        let old_pay = reprice(entry, old, settings);
        let new_pay = reprice(entry, new, settings);

        for (name, new_amount) in new_pay {
            let diff = new_amount - old_pay.get(&name).copied().unwrap_or(0.0);
            if diff > 0.0 {
                if let Some(&i) = index.get(&name) {
                    rows[i].salary_arrears += diff;
                }
            }
        }
    }

    // Allowance
    for window in half_month_windows(anchor, as_of) {
        let diff = allowance_for_period(new, &window) - allowance_for_period(old, &window);
        if diff > 0.0 {
            for row in rows.iter_mut() {
                row.allowance_arrears += diff;
            }
        }
    }

    // Bonus, completed years only
    for year in agreement_years(anchor, as_of)
        .into_iter()
        .filter(|y| y.is_complete(as_of))
    {
        let old_terms = match bonus_agreement_for(year.is_first()) {
            AgreementName::Current => old,
            AgreementName::New => new,
        };

        let entries = || snapshot.entries_between(year.start, year.end);
        let old_work = repriced_totals(entries(), old, settings);
        let new_work = repriced_totals(entries(), new, settings);

        let mut absences: HashMap<&str, i64> = HashMap::new();
        for entry in entries() {
            for earning in &entry.earnings {
                if earning.attendance_status == AttendanceStatus::Absent {
                    *absences.entry(earning.worker_name.as_str()).or_insert(0) += 1;
                }
            }
        }

        for row in rows.iter_mut() {
            let name = row.worker_name.as_str();
            let absent = absences.get(name).copied().unwrap_or(0);

            let before = annual_bonus(old_work.get(name).copied().unwrap_or(0.0), absent, old_terms);
            let after = annual_bonus(new_work.get(name).copied().unwrap_or(0.0), absent, new);

            let diff = after.total_package - before.total_package;
            if diff > 0.0 {
                row.bonus_arrears += diff;
            }
        }
    }

    for row in rows.iter_mut() {
        row.total_arrears = row.salary_arrears + row.allowance_arrears + row.bonus_arrears;
    }

    tracing::debug!("Computed arrears for {} workers up to {}", rows.len(), as_of);

    Ok(ArrearsReport {
        from: anchor,
        as_of,
        rows: snapshot.visible_rows(rows, |r| r.worker_name.as_str()),
    })
}
