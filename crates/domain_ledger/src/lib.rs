//! Ledger Domain - Fee/Bill Generation and Payment Processing
//!
//! This crate is the accounting heart of the fee ledger:
//!
//! - **Charge entities** ([`Fee`], [`Bill`]) whose paid amount and balance
//!   are always re-derivable from confirmed payments
//! - **The settlement state machine** ([`status::settlement_status`]), a pure
//!   function of (payable, paid, due date, today) with paid evaluated before
//!   the overdue override
//! - **The charge generator** ([`ChargeGenerator`]), idempotent under the
//!   skip-existing policy with per-student failure isolation
//! - **The payment processor** ([`PaymentProcessor`]), which records,
//!   confirms, and voids payments atomically with their audit entries
//! - **Domain events** ([`LedgerEvent`]) emitted after commit for settlement
//!   and delinquency transitions
//!
//! # Invariants
//!
//! For every charge at rest: `balance == amount_payable - amount_paid` and
//! `amount_paid == sum(confirmed payments)`. Every financial mutation writes
//! exactly one audit entry in the same unit of work.

pub mod bill;
pub mod charge;
pub mod error;
pub mod events;
pub mod fee;
pub mod generator;
pub mod memory;
pub mod payment;
pub mod ports;
pub mod processor;
pub mod status;

pub use bill::{Bill, BillItem, BillStatus};
pub use charge::{Charge, ChargeRef};
pub use error::LedgerError;
pub use events::{BufferPublisher, EventPublisher, LedgerEvent, NoopPublisher};
pub use fee::Fee;
pub use generator::{ChargeGenerator, GenerationFailure, GenerationRequest, GenerationSummary};
pub use memory::InMemoryLedger;
pub use payment::{generate_receipt_number, Payment, PaymentMode};
pub use ports::{
    BillBatch, FeeBatch, InsertOutcome, LedgerPort, PaymentOutcome, RosterPort,
};
pub use processor::{PaymentProcessor, PaymentRequest};
pub use status::{settlement_status, PaymentStatus, StatusPolicy};
