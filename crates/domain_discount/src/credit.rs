//! Student credits
//!
//! A credit is a non-negative amount attached to a student (overpayment,
//! manual adjustment) consumable against future charge generation. A credit
//! is consumed at most once; partial consumption is not supported, so the
//! applied amount is capped at the remaining subtotal and the credit is
//! marked used in full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{CreditId, Money, StudentId};

/// A consumable credit on a student's account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentCredit {
    /// Unique identifier
    pub id: CreditId,
    /// Owning student
    pub student_id: StudentId,
    /// Credit amount (non-negative)
    pub amount: Money,
    /// Why the credit exists
    pub reason: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// True once consumed
    pub is_used: bool,
    /// When the credit was consumed
    pub used_at: Option<DateTime<Utc>>,
    /// The charge the credit was applied to (fee or bill id)
    pub applied_to: Option<Uuid>,
}

impl StudentCredit {
    /// Creates an unused credit
    ///
    /// Negative amounts are clamped to zero; a credit can never owe.
    pub fn new(student_id: StudentId, amount: Money, reason: impl Into<String>) -> Self {
        let amount = if amount.is_negative() {
            Money::zero()
        } else {
            amount
        };
        Self {
            id: CreditId::new_v7(),
            student_id,
            amount,
            reason: reason.into(),
            created_at: Utc::now(),
            is_used: false,
            used_at: None,
            applied_to: None,
        }
    }

    /// Marks the credit consumed against a charge
    pub fn mark_used(&mut self, applied_to: Uuid, at: DateTime<Utc>) {
        self.is_used = true;
        self.used_at = Some(at);
        self.applied_to = Some(applied_to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_credit_is_unused() {
        let credit = StudentCredit::new(StudentId::new(), Money::new(dec!(150.00)), "Overpayment");
        assert!(!credit.is_used);
        assert!(credit.used_at.is_none());
        assert!(credit.applied_to.is_none());
    }

    #[test]
    fn test_negative_amount_clamped() {
        let credit = StudentCredit::new(StudentId::new(), Money::new(dec!(-20.00)), "Adjustment");
        assert_eq!(credit.amount, Money::zero());
    }

    #[test]
    fn test_mark_used() {
        let mut credit =
            StudentCredit::new(StudentId::new(), Money::new(dec!(150.00)), "Overpayment");
        let target = Uuid::new_v4();
        credit.mark_used(target, Utc::now());

        assert!(credit.is_used);
        assert_eq!(credit.applied_to, Some(target));
    }
}
