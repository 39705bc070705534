//! Pay period and report commands

use super::today;
use crate::app::AppState;
use crate::cli::ReportKind;
use crate::error::{AppError, Result};
use crate::payroll::format_money;
use crate::services::ReportSource;

pub async fn periods(state: &AppState) -> Result<()> {
    let session = state.require_session().await?;
    let today = today();

    println!("Pay periods:");
    for (i, period) in state
        .reports
        .pay_periods(&session.user_id, today)
        .await?
        .iter()
        .enumerate()
    {
        println!("  [{}] {}", i, period.label());
    }

    println!("Agreement years:");
    for (i, year) in state
        .reports
        .agreement_years(&session.user_id, today)
        .await?
        .iter()
        .enumerate()
    {
        println!("  [{}] {}", i, year.label());
    }
    Ok(())
}

pub async fn report(state: &AppState, kind: ReportKind, remote: bool) -> Result<()> {
    let session = state.require_session().await?;
    let user_id = session.user_id.as_str();
    let source = if remote {
        ReportSource::Remote
    } else {
        ReportSource::Local
    };
    let today = today();

    match kind {
        ReportKind::Salary { period } => {
            let periods = state.reports.pay_periods(user_id, today).await?;
            let period = *periods
                .get(period)
                .ok_or_else(|| AppError::Generic(format!("No pay period [{}]", period)))?;

            let report = state.reports.salary(user_id, period, source).await?;
            println!(
                "Salary for {} ({} entries, allowance {})",
                report.period.label(),
                report.entry_count,
                format_money(report.allowance)
            );
            println!("  {:<20} {:>12} {:>12} {:>12}", "Worker", "Work", "Allowance", "Total");
            for row in &report.rows {
                println!(
                    "  {:<20} {:>12} {:>12} {:>12}",
                    row.worker_name,
                    format_money(row.work_earning),
                    format_money(row.allowance),
                    format_money(row.total_salary)
                );
            }
        }
        ReportKind::Leaves { year } => {
            let years = state.reports.agreement_years(user_id, today).await?;
            let year = *years
                .get(year)
                .ok_or_else(|| AppError::Generic(format!("No agreement year [{}]", year)))?;

            let report = state.reports.leaves(user_id, year, source).await?;
            println!("Leaves for {}", report.year.label());
            println!(
                "  {:<20} {:>8} {:>8} {:>8} {:>10}",
                "Worker", "Absent", "Unpaid", "Paid", "Remaining"
            );
            for row in &report.rows {
                println!(
                    "  {:<20} {:>8} {:>8} {:>8} {:>10}",
                    row.worker_name,
                    row.balance.total_absences,
                    row.balance.unpaid_leaves_taken,
                    row.balance.paid_leaves_taken,
                    row.balance.remaining_paid_leaves
                );
            }
        }
        ReportKind::Bonus { year } => {
            let years = state.reports.agreement_years(user_id, today).await?;
            let year = *years
                .get(year)
                .ok_or_else(|| AppError::Generic(format!("No agreement year [{}]", year)))?;

            let report = state.reports.bonus(user_id, year, source).await?;
            println!("Bonus for {} under {}", report.year.label(), report.agreement_name);
            println!(
                "  {:<20} {:>12} {:>12} {:>12} {:>12} {:>12}",
                "Worker", "Avg monthly", "Bonus", "Gratuity", "Paid leaves", "Total"
            );
            for row in &report.rows {
                println!(
                    "  {:<20} {:>12} {:>12} {:>12} {:>12} {:>12}",
                    row.worker_name,
                    format_money(row.bonus.avg_monthly_salary),
                    format_money(row.bonus.annual_bonus),
                    format_money(row.bonus.gratuity),
                    format_money(row.bonus.paid_leaves_bonus),
                    format_money(row.bonus.total_package)
                );
            }
        }
        ReportKind::Arrears { as_of } => {
            let report = state
                .reports
                .arrears(user_id, as_of.unwrap_or(today), source)
                .await?;
            println!("Arrears from {} up to {}", report.from, report.as_of);
            println!(
                "  {:<20} {:>12} {:>12} {:>12} {:>12}",
                "Worker", "Salary", "Allowance", "Bonus", "Total"
            );
            for row in &report.rows {
                println!(
                    "  {:<20} {:>12} {:>12} {:>12} {:>12}",
                    row.worker_name,
                    format_money(row.salary_arrears),
                    format_money(row.allowance_arrears),
                    format_money(row.bonus_arrears),
                    format_money(row.total_arrears)
                );
            }
        }
    }
    Ok(())
}
