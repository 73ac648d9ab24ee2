//! Payment processing
//!
//! Records, confirms, and voids payments against fees and bills. Every
//! successful mutation writes exactly one payment row change, updates the
//! target, and appends one audit entry, atomically in the store; events are
//! published after the commit.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use core_kernel::{Actor, BillId, Money, PaymentId};
use domain_audit::{AuditAction, AuditRecord, EntityKind};

use crate::bill::Bill;
use crate::charge::ChargeRef;
use crate::error::LedgerError;
use crate::events::{EventPublisher, LedgerEvent};
use crate::payment::{generate_receipt_number, Payment, PaymentMode};
use crate::ports::{LedgerPort, PaymentOutcome};
use crate::status::StatusPolicy;

/// A request to record a payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// The charge being paid
    pub target: ChargeRef,
    /// Payment amount; must be positive, may exceed the balance
    pub amount: Money,
    /// Payment mode
    pub mode: PaymentMode,
    /// Value date
    pub payment_date: NaiveDate,
    /// Caller-supplied receipt number; generated when absent
    pub receipt_number: Option<String>,
    /// External reference (bank/gateway transaction id)
    pub bank_reference: Option<String>,
    /// Free-text notes
    pub notes: String,
}

impl PaymentRequest {
    pub fn new(target: ChargeRef, amount: Money, mode: PaymentMode, payment_date: NaiveDate) -> Self {
        Self {
            target,
            amount,
            mode,
            payment_date,
            receipt_number: None,
            bank_reference: None,
            notes: String::new(),
        }
    }
}

/// Applies payments to the ledger and drives the status state machine
pub struct PaymentProcessor {
    ledger: Arc<dyn LedgerPort>,
    publisher: Arc<dyn EventPublisher>,
    policy: StatusPolicy,
}

impl PaymentProcessor {
    pub fn new(ledger: Arc<dyn LedgerPort>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            publisher,
            policy: StatusPolicy::default(),
        }
    }

    /// Overrides the status policy (grace window)
    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Records a payment against a fee or bill
    ///
    /// Overpayment is accepted deliberately: clerical overpay must still
    /// reconcile, and is surfaced through the charge's overpayment amount
    /// rather than rejected.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` when the amount is zero or negative
    /// - `TargetNotAcceptingPayment` when the target is paid, cancelled, or
    ///   refunded
    pub async fn record_payment(
        &self,
        request: PaymentRequest,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<PaymentOutcome, LedgerError> {
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "payment amount must be positive, got {}",
                request.amount
            )));
        }

        // Pre-check against the current state; the store re-checks inside
        // the transaction that applies the payment.
        let charge = self.ledger.charge(request.target).await?;
        if !charge.accepts_payment() {
            return Err(LedgerError::TargetNotAcceptingPayment {
                target: request.target,
                status: charge.status_label().to_string(),
            });
        }

        let receipt_number = request
            .receipt_number
            .unwrap_or_else(generate_receipt_number);
        let mut payment = Payment::new(
            request.target,
            request.amount,
            request.mode,
            request.payment_date,
            actor,
            receipt_number,
        );
        if let Some(reference) = request.bank_reference {
            payment = payment.with_bank_reference(reference);
        }
        if !request.notes.is_empty() {
            payment = payment.with_notes(request.notes);
        }

        let audit = AuditRecord::new(
            actor,
            AuditAction::Payment,
            request.target.entity_kind(),
            request.target.entity_id(),
            json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "mode": payment.mode.code(),
                "receipt_number": payment.receipt_number,
                "confirmed": payment.is_confirmed,
            }),
        );

        let outcome = self
            .ledger
            .apply_payment(payment, &self.policy, today, audit)
            .await?;

        info!(
            payment = %outcome.payment.id,
            target = %request.target,
            amount = %outcome.payment.amount,
            status = outcome.charge.status_label(),
            "payment recorded"
        );

        self.publish_transitions(&outcome);
        Ok(outcome)
    }

    /// Confirms a pending payment (bank settlement, gateway webhook)
    pub async fn confirm_payment(
        &self,
        id: PaymentId,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<PaymentOutcome, LedgerError> {
        let payment = self.payment_or_not_found(id).await?;

        let audit = AuditRecord::new(
            actor,
            AuditAction::Confirm,
            payment.target.entity_kind(),
            payment.target.entity_id(),
            json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "receipt_number": payment.receipt_number,
            }),
        );

        let outcome = self
            .ledger
            .confirm_payment(id, actor.id, &self.policy, today, audit)
            .await?;

        info!(
            payment = %id,
            status = outcome.charge.status_label(),
            "payment confirmed"
        );

        self.publish_transitions(&outcome);
        Ok(outcome)
    }

    /// Deletes a payment as a compensating correction
    ///
    /// The target's paid amount, balance, and status are recomputed from
    /// the remaining confirmed payments; the deletion writes its own audit
    /// entry distinct from the original payment's.
    pub async fn void_payment(
        &self,
        id: PaymentId,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<PaymentOutcome, LedgerError> {
        let payment = self.payment_or_not_found(id).await?;

        let audit = AuditRecord::new(
            actor,
            AuditAction::Refund,
            payment.target.entity_kind(),
            payment.target.entity_id(),
            json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "receipt_number": payment.receipt_number,
                "reason": "payment voided",
            }),
        );

        let outcome = self
            .ledger
            .delete_payment(id, &self.policy, today, audit)
            .await?;

        info!(
            payment = %id,
            status = outcome.charge.status_label(),
            "payment voided"
        );

        self.publish_transitions(&outcome);
        Ok(outcome)
    }

    /// Cancels a bill (administrative correction; terminal)
    ///
    /// Cancelled bills reject payments and keep their status through
    /// recomputation.
    pub async fn cancel_bill(
        &self,
        id: BillId,
        actor: &Actor,
    ) -> Result<Bill, LedgerError> {
        let audit = AuditRecord::new(
            actor,
            AuditAction::Cancel,
            EntityKind::Bill,
            *id.as_uuid(),
            json!({"reason": "bill cancelled"}),
        );

        let bill = self.ledger.cancel_bill(id, audit).await?;
        info!(bill = %id, number = %bill.bill_number, "bill cancelled");
        Ok(bill)
    }

    async fn payment_or_not_found(&self, id: PaymentId) -> Result<Payment, LedgerError> {
        self.ledger.payment(id).await.map_err(|e| {
            if e.is_not_found() {
                LedgerError::PaymentNotFound(id)
            } else {
                e.into()
            }
        })
    }

    /// Emits settlement/delinquency events for transitions this mutation caused
    fn publish_transitions(&self, outcome: &PaymentOutcome) {
        let now = Utc::now();
        if !outcome.previously_settled && outcome.charge.is_settled() {
            self.publisher.publish(LedgerEvent::ChargeSettled {
                student_id: outcome.charge.student_id(),
                charge: outcome.charge.charge_ref(),
                amount_paid: outcome.charge.amount_paid(),
                timestamp: now,
            });
        }
        if !outcome.previously_overdue && outcome.charge.is_overdue() {
            self.publisher.publish(LedgerEvent::ChargeOverdue {
                student_id: outcome.charge.student_id(),
                charge: outcome.charge.charge_ref(),
                balance: outcome.charge.balance(),
                timestamp: now,
            });
        }
    }
}
