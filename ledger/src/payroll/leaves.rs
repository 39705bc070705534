//! Leave accounting
//!
//! Absences are consumed against the unpaid allowance first; whatever is
//! left over is charged to the paid allowance.

use crate::database::Agreement;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaveBalance {
    pub total_absences: i64,
    pub unpaid_leaves_taken: i64,
    pub paid_leaves_taken: i64,
    pub remaining_paid_leaves: i64,
}

impl LeaveBalance {
    pub fn from_absences(total_absences: i64, agreement: &Agreement) -> Self {
        let paid_limit = agreement.paid_leaves.max(0);
        let unpaid_limit = agreement.without_paid_leaves.max(0);

        let unpaid_leaves_taken = total_absences.min(unpaid_limit);
        let paid_leaves_taken = (total_absences - unpaid_leaves_taken).min(paid_limit);

        Self {
            total_absences,
            unpaid_leaves_taken,
            paid_leaves_taken,
            remaining_paid_leaves: paid_limit - paid_leaves_taken,
        }
    }
}
