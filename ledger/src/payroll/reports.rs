//! Salary, leave and bonus reports
//!
//! Every report starts from a [`PayrollSnapshot`] and is filtered by the
//! profile's visible workers before it is returned.

use super::bonus::{annual_bonus, bonus_agreement_for, BonusBreakdown};
use super::leaves::LeaveBalance;
use super::periods::{allowance_for_period, AgreementYear, PayPeriod};
use super::snapshot::PayrollSnapshot;
use crate::database::{AgreementName, AttendanceStatus};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryRow {
    pub worker_name: String,
    pub work_earning: f64,
    pub allowance: f64,
    pub total_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryReport {
    pub period: PayPeriod,
    pub allowance: f64,
    /// Number of entries in the period, before visibility filtering
    pub entry_count: usize,
    pub rows: Vec<SalaryRow>,
}

/// Work earnings plus allowance per worker for one pay period.
///
/// Only workers with earning records in the period get a row.
pub fn salary_report(snapshot: &PayrollSnapshot, period: PayPeriod) -> Result<SalaryReport> {
    snapshot.require_roster()?;
    let agreement = snapshot.require_agreement(AgreementName::Current)?;
    let allowance = allowance_for_period(agreement, &period);

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut entry_count = 0;

    for entry in snapshot.entries_between(period.start, period.end) {
        entry_count += 1;
        for earning in &entry.earnings {
            if !totals.contains_key(&earning.worker_name) {
                order.push(earning.worker_name.clone());
            }
            *totals.entry(earning.worker_name.clone()).or_insert(0.0) += earning.earning;
        }
    }

    let rows = order
        .into_iter()
        .map(|worker_name| {
            let work_earning = totals.get(&worker_name).copied().unwrap_or(0.0);
            SalaryRow {
                worker_name,
                work_earning,
                allowance,
                total_salary: work_earning + allowance,
            }
        })
        .collect();

    Ok(SalaryReport {
        period,
        allowance,
        entry_count,
        rows: snapshot.visible_rows(rows, |r| r.worker_name.as_str()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveRow {
    pub worker_name: String,
    #[serde(flatten)]
    pub balance: LeaveBalance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeavesReport {
    pub year: AgreementYear,
    pub rows: Vec<LeaveRow>,
}

/// Absent records per worker within the year
fn absences_by_worker(
    snapshot: &PayrollSnapshot,
    year: &AgreementYear,
) -> HashMap<String, i64> {
    let mut absences: HashMap<String, i64> = HashMap::new();
    for entry in snapshot.entries_between(year.start, year.end) {
        for earning in &entry.earnings {
            if earning.attendance_status == AttendanceStatus::Absent {
                *absences.entry(earning.worker_name.clone()).or_insert(0) += 1;
            }
        }
    }
    absences
}

/// Leave usage per roster worker for one agreement year, under the current agreement
pub fn leaves_report(snapshot: &PayrollSnapshot, year: AgreementYear) -> Result<LeavesReport> {
    snapshot.require_roster()?;
    let agreement = snapshot.require_agreement(AgreementName::Current)?;
    let absences = absences_by_worker(snapshot, &year);

    let rows = snapshot
        .workers
        .iter()
        .map(|name| LeaveRow {
            worker_name: name.clone(),
            balance: LeaveBalance::from_absences(
                absences.get(name).copied().unwrap_or(0),
                agreement,
            ),
        })
        .collect();

    Ok(LeavesReport {
        year,
        rows: snapshot.visible_rows(rows, |r| r.worker_name.as_str()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusRow {
    pub worker_name: String,
    #[serde(flatten)]
    pub bonus: BonusBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusReport {
    pub year: AgreementYear,
    pub agreement_name: AgreementName,
    pub rows: Vec<BonusRow>,
}

/// Annual bonus per roster worker; the first year uses the current agreement
pub fn bonus_report(snapshot: &PayrollSnapshot, year: AgreementYear) -> Result<BonusReport> {
    snapshot.require_roster()?;
    let agreement_name = bonus_agreement_for(year.is_first());
    let agreement = snapshot.require_agreement(agreement_name)?;
    let absences = absences_by_worker(snapshot, &year);

    let mut work: HashMap<&str, f64> = HashMap::new();
    for entry in snapshot.entries_between(year.start, year.end) {
        for earning in &entry.earnings {
            *work.entry(earning.worker_name.as_str()).or_insert(0.0) += earning.earning;
        }
    }

    let rows = snapshot
        .workers
        .iter()
        .map(|name| BonusRow {
            worker_name: name.clone(),
            bonus: annual_bonus(
                work.get(name.as_str()).copied().unwrap_or(0.0),
                absences.get(name).copied().unwrap_or(0),
                agreement,
            ),
        })
        .collect();

    Ok(BonusReport {
        year,
        agreement_name,
        rows: snapshot.visible_rows(rows, |r| r.worker_name.as_str()),
    })
}
