//! Payment records
//!
//! A payment is created once and immutable thereafter except for its
//! confirmation flag. Cash and mobile-money payments confirm on the spot;
//! gateway and bank payments stay unconfirmed until the webhook or the
//! accounts office confirms them. Only confirmed payments count toward a
//! charge's `amount_paid`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use core_kernel::{Actor, ActorId, Money, PaymentId};

use crate::charge::ChargeRef;

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Cash,
    MobileMoney,
    BankTransfer,
    Cheque,
    CreditCard,
    DebitCard,
    /// Online gateway; confirmed by webhook
    Online,
    Other,
}

impl PaymentMode {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::MobileMoney => "mobile_money",
            PaymentMode::BankTransfer => "bank_transfer",
            PaymentMode::Cheque => "cheque",
            PaymentMode::CreditCard => "credit_card",
            PaymentMode::DebitCard => "debit_card",
            PaymentMode::Online => "online",
            PaymentMode::Other => "other",
        }
    }

    /// Modes confirmed at the counter, with no settlement lag
    pub fn auto_confirms(&self) -> bool {
        matches!(self, PaymentMode::Cash | PaymentMode::MobileMoney)
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A payment against a fee or bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// The charge being paid
    pub target: ChargeRef,
    /// Payment amount (validated positive by the processor)
    pub amount: Money,
    /// Payment mode
    pub mode: PaymentMode,
    /// Value date of the payment
    pub payment_date: NaiveDate,
    /// Globally unique receipt number
    pub receipt_number: String,
    /// Recording actor; None for system-recorded (gateway) payments
    pub recorded_by: Option<ActorId>,
    /// Free-text notes
    pub notes: String,
    /// External reference (bank/gateway transaction id)
    pub bank_reference: Option<String>,
    /// Whether the payment counts toward the charge balance
    pub is_confirmed: bool,
    /// Who confirmed it, when confirmed manually
    pub confirmed_by: Option<ActorId>,
    /// When it was confirmed
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment, auto-confirming counter modes
    pub fn new(
        target: ChargeRef,
        amount: Money,
        mode: PaymentMode,
        payment_date: NaiveDate,
        recorded_by: &Actor,
        receipt_number: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let auto = mode.auto_confirms();

        Self {
            id: PaymentId::new_v7(),
            target,
            amount,
            mode,
            payment_date,
            receipt_number: receipt_number.into(),
            recorded_by: recorded_by.id,
            notes: String::new(),
            bank_reference: None,
            is_confirmed: auto,
            confirmed_by: if auto { recorded_by.id } else { None },
            confirmed_at: auto.then_some(now),
            created_at: now,
        }
    }

    /// Attaches an external reference
    pub fn with_bank_reference(mut self, reference: impl Into<String>) -> Self {
        self.bank_reference = Some(reference.into());
        self
    }

    /// Attaches notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Confirms the payment (the one mutation allowed after creation)
    pub fn confirm(&mut self, by: Option<ActorId>, at: DateTime<Utc>) {
        if self.is_confirmed {
            return;
        }
        self.is_confirmed = true;
        self.confirmed_by = by;
        self.confirmed_at = Some(at);
    }
}

/// Generates a receipt number of the form `RCPT-0123456789`
///
/// Uniqueness is enforced by the store; this only needs to make collisions
/// vanishingly rare.
pub fn generate_receipt_number() -> String {
    let digits = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("RCPT-{:010}", digits)
}
