//! The settlement state machine
//!
//! Status is a pure function of (amount_payable, amount_paid, due_date,
//! today). Paid is evaluated first and is never downgraded to overdue;
//! the overdue override applies only to unpaid and partial charges.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::Money;

/// Settlement status of a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

impl PaymentStatus {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Tunables for the status function
///
/// `grace_days` extends the due date before the overdue override kicks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusPolicy {
    pub grace_days: u32,
}

impl StatusPolicy {
    /// The due date with the grace window applied
    pub fn effective_due_date(&self, due_date: NaiveDate) -> NaiveDate {
        due_date
            .checked_add_days(Days::new(self.grace_days as u64))
            .unwrap_or(due_date)
    }
}

/// Derives the settlement status of a charge
///
/// Evaluation order matters: a fully covered balance is `paid` regardless of
/// the due date, and only unpaid/partial charges get overridden to `overdue`.
/// A negative balance (overpayment) still reports `paid`.
pub fn settlement_status(
    amount_payable: Money,
    amount_paid: Money,
    due_date: NaiveDate,
    today: NaiveDate,
    policy: &StatusPolicy,
) -> PaymentStatus {
    let balance = amount_payable - amount_paid;

    let base = if !balance.is_positive() {
        PaymentStatus::Paid
    } else if balance < amount_payable {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    };

    if base != PaymentStatus::Paid && policy.effective_due_date(due_date) < today {
        PaymentStatus::Overdue
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn status(payable: &str, paid: &str, due: NaiveDate, today: NaiveDate) -> PaymentStatus {
        settlement_status(
            Money::new(payable.parse().unwrap()),
            Money::new(paid.parse().unwrap()),
            due,
            today,
            &StatusPolicy::default(),
        )
    }

    #[test]
    fn test_no_payment_before_due_is_unpaid() {
        let today = date(2024, 9, 1);
        assert_eq!(
            status("5000.00", "0.00", date(2024, 9, 15), today),
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn test_partial_payment() {
        let today = date(2024, 9, 1);
        assert_eq!(
            status("5000.00", "3000.00", date(2024, 9, 15), today),
            PaymentStatus::Partial
        );
    }

    #[test]
    fn test_full_payment_is_paid() {
        let today = date(2024, 9, 1);
        assert_eq!(
            status("5000.00", "5000.00", date(2024, 9, 15), today),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_overpayment_is_still_paid() {
        let today = date(2024, 9, 1);
        assert_eq!(
            status("5000.00", "5200.00", date(2024, 9, 15), today),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_overdue_overrides_unpaid_and_partial() {
        let today = date(2024, 10, 1);
        let due = date(2024, 9, 15);
        assert_eq!(status("5000.00", "0.00", due, today), PaymentStatus::Overdue);
        assert_eq!(
            status("5000.00", "4500.00", due, today),
            PaymentStatus::Overdue
        );
    }

    #[test]
    fn test_paid_is_never_downgraded_to_overdue() {
        let today = date(2024, 10, 1);
        let due = date(2024, 9, 15);
        assert_eq!(
            status("5000.00", "5000.00", due, today),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let today = date(2024, 9, 15);
        assert_eq!(
            status("5000.00", "0.00", today, today),
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn test_grace_days_defer_overdue() {
        let policy = StatusPolicy { grace_days: 5 };
        let due = date(2024, 9, 15);
        let inside_grace = date(2024, 9, 18);
        let past_grace = date(2024, 9, 21);

        let payable = Money::new(dec!(100.00));
        let paid = Money::zero();

        assert_eq!(
            settlement_status(payable, paid, due, inside_grace, &policy),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            settlement_status(payable, paid, due, past_grace, &policy),
            PaymentStatus::Overdue
        );
    }

    #[test]
    fn test_zero_payable_is_paid() {
        let today = date(2024, 9, 1);
        assert_eq!(
            status("0.00", "0.00", date(2024, 9, 15), today),
            PaymentStatus::Paid
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Feeding increasing cumulative payments to a charge with a future
        // due date walks unpaid -> partial -> paid without ever reverting.
        #[test]
        fn status_is_monotonic_under_increasing_payments(
            payable in 1i64..10_000_00i64,
            steps in proptest::collection::vec(1i64..1_000_00i64, 1..20)
        ) {
            let payable = Money::from_minor(payable);
            let due = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
            let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
            let policy = StatusPolicy::default();

            let rank = |s: PaymentStatus| match s {
                PaymentStatus::Unpaid => 0,
                PaymentStatus::Partial => 1,
                PaymentStatus::Paid => 2,
                PaymentStatus::Overdue => unreachable!("future due date"),
            };

            let mut paid = Money::zero();
            let mut last = rank(settlement_status(payable, paid, due, today, &policy));
            for step in steps {
                paid = paid + Money::from_minor(step);
                let next = rank(settlement_status(payable, paid, due, today, &policy));
                prop_assert!(next >= last);
                last = next;
            }
        }
    }
}
