//! Charge abstraction over fees and bills
//!
//! Payments target either a fee or a bill; `ChargeRef` is the typed
//! reference and `Charge` the loaded entity, so the payment processor and
//! reporting queries can treat both uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use chrono::NaiveDate;
use core_kernel::{BillId, FeeId, Money, StudentId};
use domain_audit::EntityKind;

use crate::bill::Bill;
use crate::fee::Fee;
use crate::payment::Payment;
use crate::status::StatusPolicy;

/// A typed reference to a payable charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ChargeRef {
    Fee(FeeId),
    Bill(BillId),
}

impl ChargeRef {
    /// The audit entity kind for this charge
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ChargeRef::Fee(_) => EntityKind::Fee,
            ChargeRef::Bill(_) => EntityKind::Bill,
        }
    }

    /// The underlying UUID
    pub fn entity_id(&self) -> Uuid {
        match self {
            ChargeRef::Fee(id) => *id.as_uuid(),
            ChargeRef::Bill(id) => *id.as_uuid(),
        }
    }
}

impl fmt::Display for ChargeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeRef::Fee(id) => write!(f, "{}", id),
            ChargeRef::Bill(id) => write!(f, "{}", id),
        }
    }
}

/// A loaded charge, fee or bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charge {
    Fee(Fee),
    Bill(Bill),
}

impl Charge {
    /// The typed reference to this charge
    pub fn charge_ref(&self) -> ChargeRef {
        match self {
            Charge::Fee(fee) => ChargeRef::Fee(fee.id),
            Charge::Bill(bill) => ChargeRef::Bill(bill.id),
        }
    }

    /// The charged student
    pub fn student_id(&self) -> StudentId {
        match self {
            Charge::Fee(fee) => fee.student_id,
            Charge::Bill(bill) => bill.student_id,
        }
    }

    /// Total payable (frozen amount for fees, item sum for bills)
    pub fn amount_payable(&self) -> Money {
        match self {
            Charge::Fee(fee) => fee.amount_payable,
            Charge::Bill(bill) => bill.total_amount,
        }
    }

    /// Sum of confirmed payments
    pub fn amount_paid(&self) -> Money {
        match self {
            Charge::Fee(fee) => fee.amount_paid,
            Charge::Bill(bill) => bill.amount_paid,
        }
    }

    /// Outstanding balance
    pub fn balance(&self) -> Money {
        match self {
            Charge::Fee(fee) => fee.balance,
            Charge::Bill(bill) => bill.balance,
        }
    }

    /// Payment due date
    pub fn due_date(&self) -> NaiveDate {
        match self {
            Charge::Fee(fee) => fee.due_date,
            Charge::Bill(bill) => bill.due_date,
        }
    }

    /// Display label of the current status
    pub fn status_label(&self) -> &'static str {
        match self {
            Charge::Fee(fee) => fee.status.code(),
            Charge::Bill(bill) => bill.status.code(),
        }
    }

    /// True while further payments are accepted
    pub fn accepts_payment(&self) -> bool {
        match self {
            Charge::Fee(fee) => fee.accepts_payment(),
            Charge::Bill(bill) => bill.accepts_payment(),
        }
    }

    /// True once fully paid
    pub fn is_settled(&self) -> bool {
        match self {
            Charge::Fee(fee) => fee.is_settled(),
            Charge::Bill(bill) => bill.is_settled(),
        }
    }

    /// True when past due with money outstanding
    pub fn is_overdue(&self) -> bool {
        match self {
            Charge::Fee(fee) => fee.is_overdue(),
            Charge::Bill(bill) => bill.is_overdue(),
        }
    }

    /// The amount paid beyond the payable amount, if any
    pub fn overpayment(&self) -> Money {
        match self {
            Charge::Fee(fee) => fee.overpayment(),
            Charge::Bill(bill) => bill.overpayment(),
        }
    }

    /// Re-derives paid, balance, and status from the confirmed payments
    pub fn recompute(&mut self, confirmed_payments: &[Payment], policy: &StatusPolicy, today: NaiveDate) {
        match self {
            Charge::Fee(fee) => fee.recompute(confirmed_payments, policy, today),
            Charge::Bill(bill) => bill.recompute(confirmed_payments, policy, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_ref_entity_kind() {
        let fee_ref = ChargeRef::Fee(FeeId::new());
        assert_eq!(fee_ref.entity_kind(), EntityKind::Fee);

        let bill_ref = ChargeRef::Bill(BillId::new());
        assert_eq!(bill_ref.entity_kind(), EntityKind::Bill);
    }

    #[test]
    fn test_charge_ref_display_uses_prefixes() {
        let fee_ref = ChargeRef::Fee(FeeId::new());
        assert!(fee_ref.to_string().starts_with("FEE-"));
    }
}
