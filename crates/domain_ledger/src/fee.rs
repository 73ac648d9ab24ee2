//! Per-student, per-category fees
//!
//! A fee freezes the category's default amount at generation time. The paid
//! amount and balance are always re-derivable from the confirmed payments
//! against it; `recompute` is the single place that derivation happens.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    AcademicPeriod, AcademicYear, Actor, ActorId, CategoryId, FeeId, Money, StudentId, Term,
};

use crate::payment::Payment;
use crate::status::{settlement_status, PaymentStatus, StatusPolicy};

/// A per-student, per-category charge for one academic period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Unique identifier
    pub id: FeeId,
    /// Charged student
    pub student_id: StudentId,
    /// Source category
    pub category_id: CategoryId,
    /// Academic year of the billing cycle
    pub academic_year: AcademicYear,
    /// Term of the billing cycle
    pub term: Term,
    /// Amount frozen at generation time
    pub amount_payable: Money,
    /// Sum of confirmed payments (derived)
    pub amount_paid: Money,
    /// amount_payable - amount_paid (derived; negative means overpaid)
    pub balance: Money,
    /// Settlement status (derived)
    pub status: PaymentStatus,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Recording actor; None when system-generated
    pub recorded_by: Option<ActorId>,
    /// Created timestamp
    pub date_recorded: DateTime<Utc>,
    /// Last mutation timestamp
    pub last_updated: DateTime<Utc>,
}

impl Fee {
    /// Creates an unpaid fee with the amount frozen
    pub fn generate(
        student_id: StudentId,
        category_id: CategoryId,
        period: AcademicPeriod,
        amount_payable: Money,
        due_date: NaiveDate,
        recorded_by: &Actor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FeeId::new_v7(),
            student_id,
            category_id,
            academic_year: period.year,
            term: period.term,
            amount_payable,
            amount_paid: Money::zero(),
            balance: amount_payable,
            status: PaymentStatus::Unpaid,
            due_date,
            recorded_by: recorded_by.id,
            date_recorded: now,
            last_updated: now,
        }
    }

    /// The billing cycle this fee belongs to
    pub fn period(&self) -> AcademicPeriod {
        AcademicPeriod::new(self.academic_year, self.term)
    }

    /// Re-derives paid, balance, and status from the confirmed payments
    ///
    /// The caller passes the confirmed payments read inside the same unit of
    /// work that is mutating the fee; the fee never trusts a running counter.
    pub fn recompute(&mut self, confirmed_payments: &[Payment], policy: &StatusPolicy, today: NaiveDate) {
        self.amount_paid = confirmed_payments.iter().map(|p| p.amount).sum();
        self.balance = self.amount_payable - self.amount_paid;
        self.status = settlement_status(
            self.amount_payable,
            self.amount_paid,
            self.due_date,
            today,
            policy,
        );
        self.last_updated = Utc::now();
    }

    /// True while further payments are accepted
    pub fn accepts_payment(&self) -> bool {
        self.status != PaymentStatus::Paid
    }

    /// True once the balance is fully covered
    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// True when past due with money outstanding
    pub fn is_overdue(&self) -> bool {
        self.status == PaymentStatus::Overdue
    }

    /// The amount paid beyond the payable amount, if any
    pub fn overpayment(&self) -> Money {
        if self.amount_paid > self.amount_payable {
            self.amount_paid - self.amount_payable
        } else {
            Money::zero()
        }
    }

    /// True when the fee has been overpaid
    pub fn has_overpayment(&self) -> bool {
        self.amount_paid > self.amount_payable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::ChargeRef;
    use crate::payment::PaymentMode;
    use rust_decimal_macros::dec;

    fn test_fee(payable: Money, due: NaiveDate) -> Fee {
        Fee::generate(
            StudentId::new(),
            CategoryId::new(),
            AcademicPeriod::new(AcademicYear::starting(2024), Term::FIRST),
            payable,
            due,
            &Actor::system(),
        )
    }

    fn confirmed_payment(fee: &Fee, amount: Money) -> Payment {
        Payment::new(
            ChargeRef::Fee(fee.id),
            amount,
            PaymentMode::Cash,
            fee.due_date,
            &Actor::system(),
            crate::payment::generate_receipt_number(),
        )
    }

    #[test]
    fn test_generated_fee_starts_unpaid() {
        let fee = test_fee(
            Money::new(dec!(5000.00)),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        );
        assert_eq!(fee.status, PaymentStatus::Unpaid);
        assert_eq!(fee.balance, fee.amount_payable);
        assert!(fee.amount_paid.is_zero());
    }

    #[test]
    fn test_recompute_maintains_invariant() {
        let due = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let mut fee = test_fee(Money::new(dec!(5000.00)), due);

        let payments = vec![
            confirmed_payment(&fee, Money::new(dec!(1200.00))),
            confirmed_payment(&fee, Money::new(dec!(800.00))),
        ];
        fee.recompute(&payments, &StatusPolicy::default(), today);

        assert_eq!(fee.amount_paid, Money::new(dec!(2000.00)));
        assert_eq!(fee.balance, Money::new(dec!(3000.00)));
        assert_eq!(fee.balance, fee.amount_payable - fee.amount_paid);
        assert_eq!(fee.status, PaymentStatus::Partial);
    }

    #[test]
    fn test_overpayment_is_surfaced_not_rejected() {
        let due = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let mut fee = test_fee(Money::new(dec!(500.00)), due);

        let payments = vec![confirmed_payment(&fee, Money::new(dec!(650.00)))];
        fee.recompute(&payments, &StatusPolicy::default(), today);

        assert_eq!(fee.status, PaymentStatus::Paid);
        assert!(fee.has_overpayment());
        assert_eq!(fee.overpayment(), Money::new(dec!(150.00)));
        assert_eq!(fee.balance, Money::new(dec!(-150.00)));
        assert!(!fee.accepts_payment());
    }

    #[test]
    fn test_unconfirmed_payments_do_not_count() {
        let due = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let mut fee = test_fee(Money::new(dec!(500.00)), due);

        // recompute receives only confirmed payments; an empty slice models
        // a pending gateway payment awaiting its webhook
        fee.recompute(&[], &StatusPolicy::default(), today);
        assert_eq!(fee.status, PaymentStatus::Unpaid);
        assert!(fee.amount_paid.is_zero());
    }
}
