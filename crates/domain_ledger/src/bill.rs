//! Bills and bill items
//!
//! A bill is an ad-hoc or batch charge composed of line items. Items are
//! immutable once the bill is issued; money movement happens only through
//! payments, and `recompute` re-derives paid/balance/status the same way
//! fees do.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{
    AcademicPeriod, AcademicYear, Actor, ActorId, BillId, BillItemId, CategoryId, Money,
    StudentId, Term,
};

use crate::payment::Payment;
use crate::status::{settlement_status, PaymentStatus, StatusPolicy};

/// Lifecycle status of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Being assembled; items may still change
    Draft,
    /// Issued to the student, no payment yet
    Issued,
    /// Recorded directly as owing, no payment yet
    Unpaid,
    /// Partial payment received
    Partial,
    /// Fully paid
    Paid,
    /// Past due with money outstanding
    Overdue,
    /// Voided; terminal
    Cancelled,
    /// Money returned; terminal
    Refunded,
}

impl BillStatus {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Issued => "issued",
            BillStatus::Unpaid => "unpaid",
            BillStatus::Partial => "partial",
            BillStatus::Paid => "paid",
            BillStatus::Overdue => "overdue",
            BillStatus::Cancelled => "cancelled",
            BillStatus::Refunded => "refunded",
        }
    }

    /// True while the bill can take payments
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            BillStatus::Issued | BillStatus::Unpaid | BillStatus::Partial | BillStatus::Overdue
        )
    }

    /// True for states no payment or recompute may leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, BillStatus::Cancelled | BillStatus::Refunded)
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One line on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    /// Unique identifier
    pub id: BillItemId,
    /// Source category; None for adjustment lines (discounts)
    pub category_id: Option<CategoryId>,
    /// Line description
    pub description: String,
    /// Line amount; negative for adjustments
    pub amount: Money,
}

impl BillItem {
    /// A charge line generated from a category
    pub fn charge(category_id: CategoryId, description: impl Into<String>, amount: Money) -> Self {
        Self {
            id: BillItemId::new_v7(),
            category_id: Some(category_id),
            description: description.into(),
            amount,
        }
    }

    /// An adjustment line (discount, credit applied); amount is negative
    pub fn adjustment(description: impl Into<String>, amount: Money) -> Self {
        Self {
            id: BillItemId::new_v7(),
            category_id: None,
            description: description.into(),
            amount,
        }
    }
}

/// An invoice-style charge composed of line items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Unique identifier
    pub id: BillId,
    /// Sequential human-readable number (store-allocated, globally unique)
    pub bill_number: String,
    /// Charged student
    pub student_id: StudentId,
    /// Academic year of the billing cycle
    pub academic_year: AcademicYear,
    /// Term of the billing cycle
    pub term: Term,
    /// Date the bill was issued
    pub issue_date: NaiveDate,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Lifecycle status
    pub status: BillStatus,
    /// Line items, immutable once issued
    pub items: Vec<BillItem>,
    /// Exact sum of item amounts
    pub total_amount: Money,
    /// Sum of confirmed payments (derived)
    pub amount_paid: Money,
    /// total_amount - amount_paid (derived; negative means overpaid)
    pub balance: Money,
    /// Free-text notes
    pub notes: String,
    /// Recording actor; None when system-generated
    pub recorded_by: Option<ActorId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Starts a draft bill with no items
    pub fn draft(
        bill_number: impl Into<String>,
        student_id: StudentId,
        period: AcademicPeriod,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        notes: impl Into<String>,
        recorded_by: &Actor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BillId::new_v7(),
            bill_number: bill_number.into(),
            student_id,
            academic_year: period.year,
            term: period.term,
            issue_date,
            due_date,
            status: BillStatus::Draft,
            items: Vec::new(),
            total_amount: Money::zero(),
            amount_paid: Money::zero(),
            balance: Money::zero(),
            notes: notes.into(),
            recorded_by: recorded_by.id,
            created_at: now,
            updated_at: now,
        }
    }

    /// The billing cycle this bill belongs to
    pub fn period(&self) -> AcademicPeriod {
        AcademicPeriod::new(self.academic_year, self.term)
    }

    /// Appends a line item while in draft
    ///
    /// Silently ignored on issued bills; items are frozen at issue time.
    pub fn push_item(&mut self, item: BillItem) {
        if self.status != BillStatus::Draft {
            return;
        }
        self.items.push(item);
        self.total_amount = self.items.iter().map(|i| i.amount).sum();
        self.balance = self.total_amount - self.amount_paid;
        self.updated_at = Utc::now();
    }

    /// Issues the bill, freezing its items
    pub fn issue(&mut self) {
        if self.status == BillStatus::Draft {
            self.status = BillStatus::Issued;
            self.updated_at = Utc::now();
        }
    }

    /// Re-derives paid, balance, and status from the confirmed payments
    ///
    /// Terminal and draft states keep their status; amounts are re-derived
    /// regardless so a cancelled bill still reports what was paid on it.
    pub fn recompute(&mut self, confirmed_payments: &[Payment], policy: &StatusPolicy, today: NaiveDate) {
        self.amount_paid = confirmed_payments.iter().map(|p| p.amount).sum();
        self.balance = self.total_amount - self.amount_paid;
        self.updated_at = Utc::now();

        if self.status.is_terminal() || self.status == BillStatus::Draft {
            return;
        }

        self.status = match settlement_status(
            self.total_amount,
            self.amount_paid,
            self.due_date,
            today,
            policy,
        ) {
            PaymentStatus::Paid => BillStatus::Paid,
            PaymentStatus::Partial => BillStatus::Partial,
            PaymentStatus::Overdue => BillStatus::Overdue,
            // No payment yet: an issued bill stays issued, a directly
            // recorded one stays unpaid
            PaymentStatus::Unpaid => {
                if self.status == BillStatus::Unpaid {
                    BillStatus::Unpaid
                } else {
                    BillStatus::Issued
                }
            }
        };
    }

    /// Cancels the bill; returns false if it was already cancelled
    pub fn cancel(&mut self) -> bool {
        if self.status == BillStatus::Cancelled {
            return false;
        }
        self.status = BillStatus::Cancelled;
        self.updated_at = Utc::now();
        true
    }

    /// True while further payments are accepted
    pub fn accepts_payment(&self) -> bool {
        self.status.accepts_payment()
    }

    /// True once the balance is fully covered
    pub fn is_settled(&self) -> bool {
        self.status == BillStatus::Paid
    }

    /// True when past due with money outstanding
    pub fn is_overdue(&self) -> bool {
        self.status == BillStatus::Overdue
    }

    /// The amount paid beyond the total, if any
    pub fn overpayment(&self) -> Money {
        if self.amount_paid > self.total_amount {
            self.amount_paid - self.total_amount
        } else {
            Money::zero()
        }
    }

    /// True when the bill has been overpaid
    pub fn has_overpayment(&self) -> bool {
        self.amount_paid > self.total_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::ChargeRef;
    use crate::payment::{generate_receipt_number, PaymentMode};
    use rust_decimal_macros::dec;

    fn period() -> AcademicPeriod {
        AcademicPeriod::new(AcademicYear::starting(2024), Term::FIRST)
    }

    fn test_bill() -> Bill {
        let mut bill = Bill::draft(
            "BILL2024000001",
            StudentId::new(),
            period(),
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            "",
            &Actor::system(),
        );
        bill.push_item(BillItem::charge(
            CategoryId::new(),
            "Tuition Fees - Term 1",
            Money::new(dec!(5000.00)),
        ));
        bill.push_item(BillItem::charge(
            CategoryId::new(),
            "Technology Fee - Term 1",
            Money::new(dec!(300.00)),
        ));
        bill.issue();
        bill
    }

    fn confirmed_payment(bill: &Bill, amount: Money) -> Payment {
        Payment::new(
            ChargeRef::Bill(bill.id),
            amount,
            PaymentMode::Cash,
            bill.due_date,
            &Actor::system(),
            generate_receipt_number(),
        )
    }

    #[test]
    fn test_total_is_exact_item_sum() {
        let bill = test_bill();
        assert_eq!(bill.total_amount, Money::new(dec!(5300.00)));
        assert_eq!(bill.balance, Money::new(dec!(5300.00)));
        assert_eq!(bill.status, BillStatus::Issued);
    }

    #[test]
    fn test_adjustment_item_reduces_total() {
        let mut bill = Bill::draft(
            "BILL2024000002",
            StudentId::new(),
            period(),
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            "",
            &Actor::system(),
        );
        bill.push_item(BillItem::charge(
            CategoryId::new(),
            "Tuition Fees - Term 1",
            Money::new(dec!(5000.00)),
        ));
        bill.push_item(BillItem::adjustment(
            "Sibling discount (10%)",
            Money::new(dec!(-500.00)),
        ));
        bill.issue();

        assert_eq!(bill.total_amount, Money::new(dec!(4500.00)));
    }

    #[test]
    fn test_items_frozen_after_issue() {
        let mut bill = test_bill();
        let total_before = bill.total_amount;
        bill.push_item(BillItem::charge(
            CategoryId::new(),
            "Late addition",
            Money::new(dec!(999.00)),
        ));
        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.total_amount, total_before);
    }

    #[test]
    fn test_recompute_transitions() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
        let policy = StatusPolicy::default();
        let mut bill = test_bill();

        let p1 = confirmed_payment(&bill, Money::new(dec!(2000.00)));
        bill.recompute(&[p1.clone()], &policy, today);
        assert_eq!(bill.status, BillStatus::Partial);
        assert_eq!(bill.balance, Money::new(dec!(3300.00)));

        let p2 = confirmed_payment(&bill, Money::new(dec!(3300.00)));
        bill.recompute(&[p1, p2], &policy, today);
        assert_eq!(bill.status, BillStatus::Paid);
        assert!(bill.balance.is_zero());
    }

    #[test]
    fn test_cancelled_bill_keeps_status_through_recompute() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        let mut bill = test_bill();
        assert!(bill.cancel());
        assert!(!bill.cancel());

        bill.recompute(&[], &StatusPolicy::default(), today);
        assert_eq!(bill.status, BillStatus::Cancelled);
        assert!(!bill.accepts_payment());
    }

    #[test]
    fn test_issued_bill_goes_overdue_past_due_date() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 10).unwrap();
        let mut bill = test_bill();
        bill.recompute(&[], &StatusPolicy::default(), today);
        assert_eq!(bill.status, BillStatus::Overdue);
    }
}
