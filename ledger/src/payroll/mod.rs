//! Payroll calculator
//!
//! Pure computations over agreement rates, settings and recorded days.
//! Nothing here touches the store or the network; callers build a
//! [`PayrollSnapshot`] from either source and pass it in.

pub mod arrears;
pub mod bonus;
pub mod earnings;
pub mod leaves;
pub mod periods;
pub mod reports;
pub mod snapshot;

pub use arrears::{arrears_report, ArrearsReport, ArrearsRow};
pub use bonus::{annual_bonus, BonusBreakdown};
pub use earnings::{compute_daily_earnings, DayInput};
pub use leaves::LeaveBalance;
pub use periods::{agreement_years, allowance_for_period, pay_periods, AgreementYear, PayPeriod};
pub use reports::{bonus_report, leaves_report, salary_report, BonusReport, LeavesReport, SalaryReport};
pub use snapshot::{EntryRecord, PayrollSnapshot};

/// Round to cents for display
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_money(value: f64) -> String {
    format!("{:.2}", round_money(value))
}
