//! Annual bonus and gratuity

use super::leaves::LeaveBalance;
use crate::database::{Agreement, AgreementName};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BonusBreakdown {
    pub avg_monthly_salary: f64,
    pub annual_bonus: f64,
    pub gratuity: f64,
    pub paid_leaves_bonus: f64,
    pub total_package: f64,
}

/// Bonus package for one worker over one agreement year.
///
/// `work_earnings` is the sum of the worker's earning records in the year,
/// `absences` the number of absent records.
pub fn annual_bonus(work_earnings: f64, absences: i64, agreement: &Agreement) -> BonusBreakdown {
    let total = work_earnings + agreement.monthly_allowance * 12.0;
    let avg_monthly_salary = if total > 0.0 { total / 12.0 } else { 0.0 };

    let leaves = LeaveBalance::from_absences(absences, agreement);
    let paid_leaves_bonus = leaves.remaining_paid_leaves as f64 * agreement.paid_leave_rate;

    BonusBreakdown {
        avg_monthly_salary,
        annual_bonus: avg_monthly_salary,
        gratuity: avg_monthly_salary,
        paid_leaves_bonus,
        total_package: avg_monthly_salary * 2.0 + paid_leaves_bonus,
    }
}

/// Agreement whose terms apply to a bonus year
pub fn bonus_agreement_for(first_year: bool) -> AgreementName {
    if first_year {
        AgreementName::Current
    } else {
        AgreementName::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AllowanceType;

    fn agreement() -> Agreement {
        Agreement {
            user_id: "u1".to_string(),
            agreement_name: AgreementName::New,
            ton_rate: 0.0,
            rest_rate: 0.0,
            layoff_rate: 0.0,
            wagon_rate: 0.0,
            monthly_allowance: 1000.0,
            allowance_calculation_type: AllowanceType::Normal,
            paid_leaves: 10,
            without_paid_leaves: 2,
            paid_leave_rate: 50.0,
        }
    }

    #[test]
    fn test_bonus_package() {
        let bonus = annual_bonus(24_000.0, 4, &agreement());

        assert_eq!(bonus.avg_monthly_salary, 3000.0);
        assert_eq!(bonus.annual_bonus, 3000.0);
        assert_eq!(bonus.gratuity, 3000.0);
        // 4 absences: 2 unpaid, 2 paid, 8 paid days left
        assert_eq!(bonus.paid_leaves_bonus, 400.0);
        assert_eq!(bonus.total_package, 6400.0);
    }

    #[test]
    fn test_non_positive_total_gives_zero_average() {
        let mut agreement = agreement();
        agreement.monthly_allowance = 0.0;

        let bonus = annual_bonus(0.0, 0, &agreement);
        assert_eq!(bonus.avg_monthly_salary, 0.0);
        assert_eq!(bonus.total_package, 500.0);
    }

    #[test]
    fn test_bonus_agreement_by_year() {
        assert_eq!(bonus_agreement_for(true), AgreementName::Current);
        assert_eq!(bonus_agreement_for(false), AgreementName::New);
    }
}
