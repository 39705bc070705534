//! Per-entry earnings
//!
//! Turns one day of recorded work into an earning record per roster worker.
//! Present workers share the tonnage pay; absent workers get the layoff rate
//! unless they are red-flagged for exhausting their leave allowance.

use crate::config::SPECIAL_OVERTIME_GUARANTEE_FACTOR;
use crate::database::{Agreement, AttendanceStatus, DayType, EarningDraft, UserSettings};
use std::collections::HashMap;

/// One day of work as the calculator sees it
#[derive(Debug, Clone, Copy)]
pub struct DayInput<'a> {
    pub day_type: DayType,
    /// Ignored on rest days
    pub tonnage: Option<f64>,
    pub wagons: i64,
    pub present: &'a [String],
    pub absent: &'a [String],
    /// Absent workers who already used up their leave allowance
    pub red_flagged: &'a [String],
}

impl DayInput<'_> {
    fn is_red_flagged(&self, name: &str) -> bool {
        self.red_flagged.iter().any(|n| n == name)
    }

    fn red_flagged_absent(&self) -> usize {
        self.absent.iter().filter(|n| self.is_red_flagged(n)).count()
    }
}

/// Penalty share subtracted from each present worker
fn penalty_per_present(input: &DayInput, settings: &UserSettings) -> f64 {
    if !settings.is_penalty_system_enabled || input.present.is_empty() || input.absent.is_empty() {
        return 0.0;
    }

    input.red_flagged_absent() as f64 * settings.penalty_amount / input.present.len() as f64
}

fn wagon_bonus(input: &DayInput, agreement: &Agreement, settings: &UserSettings) -> f64 {
    if !settings.is_wagon_system_enabled || input.day_type.is_rest() || input.wagons <= 0 {
        return 0.0;
    }

    input.wagons as f64 * agreement.wagon_rate / input.present.len() as f64
}

/// Pay of every present worker for the day; 0 when nobody was present
pub fn present_worker_earning(input: &DayInput, agreement: &Agreement, settings: &UserSettings) -> f64 {
    if input.present.is_empty() {
        return 0.0;
    }

    let present = input.present.len() as f64;
    let penalty = penalty_per_present(input, settings);
    let layoff = agreement.layoff_rate;
    let base = input.tonnage.unwrap_or(0.0) * agreement.ton_rate / present;

    // The floor always wins over the penalty
    let floored = match input.day_type {
        DayType::WorkDay => (base - penalty).max(layoff),
        DayType::SpecialOvertime => {
            (base * 2.0 + layoff - penalty).max(layoff * SPECIAL_OVERTIME_GUARANTEE_FACTOR)
        }
        DayType::RestDay => (agreement.rest_rate - penalty).max(layoff),
    };

    floored + wagon_bonus(input, agreement, settings)
}

/// Pay of an absent worker
pub fn absent_worker_earning(
    input: &DayInput,
    name: &str,
    agreement: &Agreement,
    settings: &UserSettings,
) -> f64 {
    if settings.is_penalty_system_enabled && input.is_red_flagged(name) {
        0.0
    } else {
        agreement.layoff_rate
    }
}

/// Earning records for a day: present workers first, then absent ones
pub fn compute_daily_earnings(
    input: &DayInput,
    agreement: &Agreement,
    settings: &UserSettings,
) -> Vec<EarningDraft> {
    let pay = present_worker_earning(input, agreement, settings);

    let present = input.present.iter().map(|name| EarningDraft {
        worker_name: name.clone(),
        earning: pay,
        attendance_status: AttendanceStatus::Present,
    });

    let absent = input.absent.iter().map(|name| EarningDraft {
        worker_name: name.clone(),
        earning: absent_worker_earning(input, name, agreement, settings),
        attendance_status: AttendanceStatus::Absent,
    });

    present.chain(absent).collect()
}

/// Absent workers whose prior leave count reached the combined allowance
pub fn red_flagged_workers(
    absent: &[String],
    leave_counts: &HashMap<String, usize>,
    agreement: &Agreement,
) -> Vec<String> {
    let allowed = agreement.total_allowed_leaves().max(0) as usize;

    absent
        .iter()
        .filter(|name| leave_counts.get(*name).copied().unwrap_or(0) >= allowed)
        .cloned()
        .collect()
}

/// Leave records (absent or paid leave) per worker, from `(name, status)` pairs
pub fn leave_counts<'a>(
    records: impl IntoIterator<Item = (&'a str, AttendanceStatus)>,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for (name, status) in records {
        if status.is_leave() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AgreementName, AllowanceType};

    fn agreement() -> Agreement {
        Agreement {
            user_id: "u1".to_string(),
            agreement_name: AgreementName::Current,
            ton_rate: 100.0,
            rest_rate: 80.0,
            layoff_rate: 50.0,
            wagon_rate: 30.0,
            monthly_allowance: 3000.0,
            allowance_calculation_type: AllowanceType::Normal,
            paid_leaves: 2,
            without_paid_leaves: 1,
            paid_leave_rate: 100.0,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn work_day<'a>(
        day_type: DayType,
        tonnage: f64,
        present: &'a [String],
        absent: &'a [String],
        red_flagged: &'a [String],
    ) -> DayInput<'a> {
        DayInput {
            day_type,
            tonnage: Some(tonnage),
            wagons: 0,
            present,
            absent,
            red_flagged,
        }
    }

    #[test]
    fn test_work_day_single_worker() {
        let present = names(&["Ali"]);
        let input = work_day(DayType::WorkDay, 2.0, &present, &[], &[]);

        let earnings = compute_daily_earnings(&input, &agreement(), &UserSettings::new("u1"));
        assert_eq!(earnings.len(), 1);
        assert_eq!(earnings[0].earning, 200.0);
        assert_eq!(earnings[0].attendance_status, AttendanceStatus::Present);
    }

    #[test]
    fn test_special_overtime_doubles_base_plus_layoff() {
        let present = names(&["Ali"]);
        let input = work_day(DayType::SpecialOvertime, 2.0, &present, &[], &[]);

        let pay = present_worker_earning(&input, &agreement(), &UserSettings::new("u1"));
        assert_eq!(pay, 450.0);
    }

    #[test]
    fn test_special_overtime_guarantee() {
        let present = names(&["Ali"]);
        let input = work_day(DayType::SpecialOvertime, 0.0, &present, &[], &[]);

        let pay = present_worker_earning(&input, &agreement(), &UserSettings::new("u1"));
        assert_eq!(pay, 150.0);
    }

    #[test]
    fn test_special_overtime_guarantee_wins_over_penalty() {
        let present = names(&["Ali", "Bilal"]);
        let absent = names(&["Chand"]);
        let mut settings = UserSettings::new("u1");
        settings.is_penalty_system_enabled = true;
        settings.penalty_amount = 20.0;

        // 0.5 t shared by two: 25 * 2 + 50 - 10 = 90, under the 3 x 50 guarantee
        let input = work_day(DayType::SpecialOvertime, 0.5, &present, &absent, &absent);
        assert_eq!(present_worker_earning(&input, &agreement(), &settings), 150.0);
    }

    #[test]
    fn test_penalty_is_floored_and_red_flag_earns_nothing() {
        let present = names(&["Ali", "Bilal"]);
        let absent = names(&["Chand"]);
        let mut settings = UserSettings::new("u1");
        settings.is_penalty_system_enabled = true;
        settings.penalty_amount = 20.0;

        let input = work_day(DayType::WorkDay, 0.0, &present, &absent, &absent);
        let earnings = compute_daily_earnings(&input, &agreement(), &settings);

        assert_eq!(earnings[0].earning, 50.0);
        assert_eq!(earnings[1].earning, 50.0);
        assert_eq!(earnings[2].worker_name, "Chand");
        assert_eq!(earnings[2].earning, 0.0);
        assert_eq!(earnings[2].attendance_status, AttendanceStatus::Absent);
    }

    #[test]
    fn test_penalty_reduces_pay_above_floor() {
        let present = names(&["Ali", "Bilal"]);
        let absent = names(&["Chand"]);
        let mut settings = UserSettings::new("u1");
        settings.is_penalty_system_enabled = true;
        settings.penalty_amount = 20.0;

        let input = work_day(DayType::WorkDay, 4.0, &present, &absent, &absent);
        assert_eq!(present_worker_earning(&input, &agreement(), &settings), 190.0);
    }

    #[test]
    fn test_penalty_disabled_ignores_red_flags() {
        let present = names(&["Ali"]);
        let absent = names(&["Chand"]);
        let input = work_day(DayType::WorkDay, 4.0, &present, &absent, &absent);

        let earnings = compute_daily_earnings(&input, &agreement(), &UserSettings::new("u1"));
        assert_eq!(earnings[0].earning, 400.0);
        assert_eq!(earnings[1].earning, 50.0);
    }

    #[test]
    fn test_nobody_present() {
        let absent = names(&["Ali", "Bilal"]);
        let input = work_day(DayType::WorkDay, 5.0, &[], &absent, &[]);

        let earnings = compute_daily_earnings(&input, &agreement(), &UserSettings::new("u1"));
        assert_eq!(earnings.len(), 2);
        assert!(earnings.iter().all(|e| e.earning == 50.0));
    }

    #[test]
    fn test_rest_day_pays_rest_rate() {
        let present = names(&["Ali", "Bilal"]);
        let input = DayInput {
            day_type: DayType::RestDay,
            tonnage: None,
            wagons: 3,
            present: &present,
            absent: &[],
            red_flagged: &[],
        };
        let mut settings = UserSettings::new("u1");
        settings.is_wagon_system_enabled = true;

        // No wagon bonus on rest days
        assert_eq!(present_worker_earning(&input, &agreement(), &settings), 80.0);
    }

    #[test]
    fn test_wagon_bonus_added_after_floor() {
        let present = names(&["Ali", "Bilal"]);
        let input = DayInput {
            day_type: DayType::WorkDay,
            tonnage: Some(0.0),
            wagons: 4,
            present: &present,
            absent: &[],
            red_flagged: &[],
        };
        let mut settings = UserSettings::new("u1");
        settings.is_wagon_system_enabled = true;

        assert_eq!(present_worker_earning(&input, &agreement(), &settings), 110.0);
    }

    #[test]
    fn test_floor_holds_for_every_day_type() {
        let present = names(&["Ali", "Bilal", "Chand"]);
        let absent = names(&["Dawood", "Ehsan"]);
        let mut settings = UserSettings::new("u1");
        settings.is_penalty_system_enabled = true;
        settings.penalty_amount = 500.0;

        for day_type in [DayType::WorkDay, DayType::SpecialOvertime, DayType::RestDay] {
            for tonnage in [0.0, 0.5, 3.0, 40.0] {
                let input = work_day(day_type, tonnage, &present, &absent, &absent);
                let pay = present_worker_earning(&input, &agreement(), &settings);
                let floor = match day_type {
                    DayType::SpecialOvertime => {
                        agreement().layoff_rate * SPECIAL_OVERTIME_GUARANTEE_FACTOR
                    }
                    _ => agreement().layoff_rate,
                };
                assert!(pay >= floor, "{day_type} {tonnage}: {pay} below {floor}");
            }
        }
    }

    #[test]
    fn test_red_flag_threshold() {
        let absent = names(&["Ali", "Bilal"]);
        let counts = HashMap::from([("Ali".to_string(), 3), ("Bilal".to_string(), 2)]);

        let flagged = red_flagged_workers(&absent, &counts, &agreement());
        assert_eq!(flagged, vec!["Ali"]);
    }

    #[test]
    fn test_leave_counts_include_paid_leave() {
        let records = [
            ("Ali", AttendanceStatus::Absent),
            ("Ali", AttendanceStatus::PaidLeave),
            ("Bilal", AttendanceStatus::Present),
        ];

        let counts = leave_counts(records);
        assert_eq!(counts.get("Ali"), Some(&2));
        assert_eq!(counts.get("Bilal"), None);
    }
}
