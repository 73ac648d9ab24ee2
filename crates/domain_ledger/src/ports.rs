//! Ledger domain ports
//!
//! The ledger port exposes composite atomic operations rather than bare row
//! access: skip-existing checks, payment application, and audit writes all
//! happen inside one store transaction, because splitting them across calls
//! is exactly the lost-update and duplicate-row race surface the ledger must
//! not have.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    AcademicPeriod, ActorId, BillId, ClassLevel, CreditId, DomainPort, FeeId, PaymentId,
    PortError, StudentId, StudentRef,
};
use domain_audit::AuditRecord;

use crate::bill::Bill;
use crate::charge::{Charge, ChargeRef};
use crate::fee::Fee;
use crate::payment::Payment;
use crate::status::StatusPolicy;

/// Port to the external roster service
#[async_trait]
pub trait RosterPort: DomainPort {
    /// Active students, optionally filtered by class level (empty = all)
    async fn active_students(
        &self,
        class_levels: &[ClassLevel],
    ) -> Result<Vec<StudentRef>, PortError>;
}

/// A batch of generated fees for one student, inserted atomically
#[derive(Debug, Clone)]
pub struct FeeBatch {
    pub student_id: StudentId,
    pub period: AcademicPeriod,
    pub fees: Vec<Fee>,
    /// Credits to mark consumed in the same transaction
    pub consume_credits: Vec<CreditId>,
    /// One audit record per created fee
    pub audit: Vec<AuditRecord>,
}

/// A generated bill for one student, inserted atomically
#[derive(Debug, Clone)]
pub struct BillBatch {
    pub bill: Bill,
    /// Credits to mark consumed in the same transaction
    pub consume_credits: Vec<CreditId>,
    /// One audit record for the created bill
    pub audit: AuditRecord,
}

/// Result of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Records created by this call
    pub created: usize,
    /// True when skip-existing found prior records and created nothing
    pub skipped_existing: bool,
}

/// Result of a payment mutation
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The payment as persisted (or deleted, for voids)
    pub payment: Payment,
    /// The target charge after recomputation
    pub charge: Charge,
    /// Whether the charge was settled before this mutation
    pub previously_settled: bool,
    /// Whether the charge was overdue before this mutation
    pub previously_overdue: bool,
}

/// Port to the fee/bill ledger store
///
/// Implementations must serialize mutations against the same charge (row
/// lock or equivalent) and re-read confirmed payments inside the same
/// transaction that writes the mutation. Every mutating method takes the
/// audit record(s) it must persist atomically; an audit write failure rolls
/// the whole operation back and surfaces as `PortError::AuditWriteFailed`.
#[async_trait]
pub trait LedgerPort: DomainPort {
    /// Looks up one fee
    async fn fee(&self, id: FeeId) -> Result<Fee, PortError>;

    /// Looks up one bill
    async fn bill(&self, id: BillId) -> Result<Bill, PortError>;

    /// Looks up a charge by typed reference
    async fn charge(&self, target: ChargeRef) -> Result<Charge, PortError>;

    /// Looks up one payment
    async fn payment(&self, id: PaymentId) -> Result<Payment, PortError>;

    /// Confirmed payments against a charge, oldest first
    async fn confirmed_payments(&self, target: ChargeRef) -> Result<Vec<Payment>, PortError>;

    /// Allocates the next sequential bill number
    async fn allocate_bill_number(&self) -> Result<String, PortError>;

    /// Inserts a student's generated fees
    ///
    /// If any fee already exists for (student, period): with `skip_existing`
    /// the call creates nothing and reports `skipped_existing`; without it
    /// the call fails with `PortError::Conflict`.
    async fn insert_fees(
        &self,
        batch: FeeBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError>;

    /// Inserts a single ad-hoc fee (no period-level idempotency check)
    ///
    /// Fails with `PortError::Conflict` if a fee for the same
    /// (student, category, period) already exists.
    async fn insert_fee(&self, fee: Fee, audit: AuditRecord) -> Result<(), PortError>;

    /// Inserts a student's generated bill, same idempotency contract as
    /// `insert_fees` keyed on (student, period)
    async fn insert_bill(
        &self,
        batch: BillBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError>;

    /// Applies a payment to its target
    ///
    /// Inside one transaction: verifies the target still accepts payments
    /// and the receipt number is unused, inserts the payment, re-reads the
    /// confirmed payments, recomputes the target, and appends the audit
    /// record.
    async fn apply_payment(
        &self,
        payment: Payment,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError>;

    /// Confirms a pending payment and recomputes its target
    ///
    /// Fails with `PortError::Conflict` if already confirmed.
    async fn confirm_payment(
        &self,
        id: PaymentId,
        confirmed_by: Option<ActorId>,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError>;

    /// Deletes a payment as a compensating correction and recomputes its
    /// target from the remaining confirmed payments
    async fn delete_payment(
        &self,
        id: PaymentId,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError>;

    /// Cancels a bill
    ///
    /// Fails with `PortError::Conflict` if already cancelled.
    async fn cancel_bill(&self, id: BillId, audit: AuditRecord) -> Result<Bill, PortError>;

    /// All charges (fees and bills) for a billing cycle
    async fn charges_for_period(
        &self,
        period: &AcademicPeriod,
    ) -> Result<Vec<Charge>, PortError>;

    /// All charges with a positive outstanding balance
    async fn outstanding_charges(&self) -> Result<Vec<Charge>, PortError>;
}
