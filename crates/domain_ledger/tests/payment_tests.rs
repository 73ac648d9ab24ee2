//! Payment processor integration tests
//!
//! Walks the settlement scenarios end to end against the in-memory store:
//! partial and full payment, overpayment leniency, the overdue override,
//! confirmation flow, voids, event emission, and audit atomicity.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{
    AcademicPeriod, AcademicYear, Actor, ActorId, CategoryId, Money, StudentId, Term,
};
use domain_audit::{AuditAction, AuditPort};
use domain_ledger::{
    BufferPublisher, Charge, ChargeRef, Fee, InMemoryLedger, LedgerError, LedgerEvent,
    LedgerPort, PaymentMode, PaymentProcessor, PaymentRequest,
};

fn period() -> AcademicPeriod {
    AcademicPeriod::new(AcademicYear::parse("2024/2025").unwrap(), Term::FIRST)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 10).unwrap()
}

struct Harness {
    store: Arc<InMemoryLedger>,
    publisher: Arc<BufferPublisher>,
    processor: PaymentProcessor,
    actor: Actor,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryLedger::new());
        let publisher = Arc::new(BufferPublisher::new());
        let processor = PaymentProcessor::new(store.clone(), publisher.clone());
        Self {
            store,
            publisher,
            processor,
            actor: Actor::accountant(ActorId::new()),
        }
    }

    /// Seeds a fee directly into the store and returns its reference
    async fn seed_fee(&self, payable: Money, due_date: NaiveDate) -> ChargeRef {
        let fee = Fee::generate(
            StudentId::new(),
            CategoryId::new(),
            period(),
            payable,
            due_date,
            &Actor::system(),
        );
        let record = domain_audit::AuditRecord::new(
            &Actor::system(),
            AuditAction::Create,
            domain_audit::EntityKind::Fee,
            *fee.id.as_uuid(),
            serde_json::json!({}),
        );
        let target = ChargeRef::Fee(fee.id);
        self.store.insert_fee(fee, record).await.unwrap();
        target
    }

    async fn pay(&self, target: ChargeRef, amount: Money) -> Result<Charge, LedgerError> {
        let outcome = self
            .processor
            .record_payment(
                PaymentRequest::new(target, amount, PaymentMode::Cash, today()),
                &self.actor,
                today(),
            )
            .await?;
        Ok(outcome.charge)
    }
}

fn future_due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
}

fn past_due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 9).unwrap()
}

#[tokio::test]
async fn partial_then_full_payment_walks_the_state_machine() {
    // Scenario: 5000.00 fee; pay 3000.00 then 2000.00
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(5000.00)), future_due()).await;

    let after_first = harness
        .pay(target, Money::new(dec!(3000.00)))
        .await
        .unwrap();
    assert_eq!(after_first.amount_paid(), Money::new(dec!(3000.00)));
    assert_eq!(after_first.balance(), Money::new(dec!(2000.00)));
    assert_eq!(after_first.status_label(), "partial");

    let after_second = harness
        .pay(target, Money::new(dec!(2000.00)))
        .await
        .unwrap();
    assert_eq!(after_second.balance(), Money::zero());
    assert_eq!(after_second.status_label(), "paid");
}

#[tokio::test]
async fn invariant_holds_after_every_payment() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(777.77)), future_due()).await;

    for amount in ["100.01", "250.49", "300.00"] {
        let charge = harness
            .pay(target, Money::new(amount.parse().unwrap()))
            .await
            .unwrap();

        let payments = harness.store.confirmed_payments(target).await.unwrap();
        let paid: Money = payments.iter().map(|p| p.amount).sum();
        assert_eq!(charge.amount_paid(), paid);
        assert_eq!(charge.balance(), charge.amount_payable() - paid);
    }
}

#[tokio::test]
async fn zero_and_negative_amounts_are_rejected_before_any_write() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;

    let err = harness.pay(target, Money::zero()).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = harness
        .pay(target, Money::new(dec!(-10.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    assert!(harness
        .store
        .confirmed_payments(target)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn overpayment_is_tolerated_and_surfaced() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;

    let charge = harness
        .pay(target, Money::new(dec!(650.00)))
        .await
        .unwrap();

    assert_eq!(charge.status_label(), "paid");
    assert_eq!(charge.balance(), Money::new(dec!(-150.00)));
    assert_eq!(charge.overpayment(), Money::new(dec!(150.00)));
}

#[tokio::test]
async fn paid_charge_rejects_further_payments() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;
    harness.pay(target, Money::new(dec!(500.00))).await.unwrap();

    let err = harness
        .pay(target, Money::new(dec!(1.00)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TargetNotAcceptingPayment { .. }
    ));
}

#[tokio::test]
async fn partial_payment_past_due_reports_overdue() {
    // Scenario: due date yesterday, balance outstanding, previously partial
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(1000.00)), past_due()).await;

    let charge = harness
        .pay(target, Money::new(dec!(500.00)))
        .await
        .unwrap();
    assert_eq!(charge.status_label(), "overdue");
    assert_eq!(charge.balance(), Money::new(dec!(500.00)));
}

#[tokio::test]
async fn full_payment_past_due_is_paid_not_overdue() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(1000.00)), past_due()).await;

    let charge = harness
        .pay(target, Money::new(dec!(1000.00)))
        .await
        .unwrap();
    assert_eq!(charge.status_label(), "paid");
}

#[tokio::test]
async fn settlement_and_delinquency_events_are_published() {
    let harness = Harness::new();

    let settled = harness.seed_fee(Money::new(dec!(100.00)), future_due()).await;
    harness.pay(settled, Money::new(dec!(100.00))).await.unwrap();

    let overdue = harness.seed_fee(Money::new(dec!(100.00)), past_due()).await;
    harness.pay(overdue, Money::new(dec!(40.00))).await.unwrap();

    let events = harness.publisher.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        LedgerEvent::ChargeSettled { charge, .. } if *charge == settled
    ));
    assert!(matches!(
        &events[1],
        LedgerEvent::ChargeOverdue { charge, balance, .. }
            if *charge == overdue && *balance == Money::new(dec!(60.00))
    ));
}

#[tokio::test]
async fn unconfirmed_online_payment_does_not_move_the_balance() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;

    let outcome = harness
        .processor
        .record_payment(
            PaymentRequest::new(target, Money::new(dec!(500.00)), PaymentMode::Online, today()),
            &Actor::system(),
            today(),
        )
        .await
        .unwrap();

    assert!(!outcome.payment.is_confirmed);
    assert_eq!(outcome.charge.amount_paid(), Money::zero());
    assert_eq!(outcome.charge.status_label(), "unpaid");

    // Webhook lands: confirmation moves the balance and settles the fee
    let confirmed = harness
        .processor
        .confirm_payment(outcome.payment.id, &harness.actor, today())
        .await
        .unwrap();
    assert!(confirmed.payment.is_confirmed);
    assert_eq!(confirmed.charge.status_label(), "paid");

    let events = harness.publisher.drain();
    assert!(matches!(events.as_slice(), [LedgerEvent::ChargeSettled { .. }]));
}

#[tokio::test]
async fn void_payment_recomputes_and_audits_separately() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;

    let outcome = harness
        .processor
        .record_payment(
            PaymentRequest::new(target, Money::new(dec!(500.00)), PaymentMode::Cash, today()),
            &harness.actor,
            today(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.charge.status_label(), "paid");

    let voided = harness
        .processor
        .void_payment(outcome.payment.id, &harness.actor, today())
        .await
        .unwrap();

    // Compensating action: the fee reverts to unpaid, not silently dropped
    assert_eq!(voided.charge.status_label(), "unpaid");
    assert_eq!(voided.charge.balance(), Money::new(dec!(500.00)));

    let entries = harness
        .store
        .entries_for_entity(target.entity_kind(), target.entity_id())
        .await
        .unwrap();
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::Payment));
    assert!(actions.contains(&AuditAction::Refund));
}

#[tokio::test]
async fn every_payment_mutation_leaves_an_audit_entry() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(900.00)), future_due()).await;

    harness.pay(target, Money::new(dec!(300.00))).await.unwrap();
    harness.pay(target, Money::new(dec!(600.00))).await.unwrap();

    let entries = harness
        .store
        .entries_for_entity(target.entity_kind(), target.entity_id())
        .await
        .unwrap();

    // One Create from seeding plus one Payment per recorded payment
    let payments = entries
        .iter()
        .filter(|e| e.action == AuditAction::Payment)
        .count();
    assert_eq!(payments, 2);

    // Sequence numbers are strictly increasing
    let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
    let mut sorted = sequences.clone();
    sorted.sort_unstable();
    assert_eq!(sequences, sorted);

    // Entries are attributed to the recording actor
    assert!(entries
        .iter()
        .filter(|e| e.action == AuditAction::Payment)
        .all(|e| e.actor_id == harness.actor.id));
}

#[tokio::test]
async fn audit_failure_aborts_the_payment() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(500.00)), future_due()).await;

    harness.store.inject_audit_fault();
    let err = harness
        .pay(target, Money::new(dec!(200.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AuditWriteFailed(_)));

    // Rolled back: no payment row, balance untouched
    assert!(harness
        .store
        .confirmed_payments(target)
        .await
        .unwrap()
        .is_empty());
    let charge = harness.store.charge(target).await.unwrap();
    assert_eq!(charge.balance(), Money::new(dec!(500.00)));
    assert_eq!(charge.status_label(), "unpaid");
}

#[tokio::test]
async fn cancelled_bill_rejects_payments_and_keeps_status() {
    use core_kernel::CategoryId;
    use domain_ledger::{Bill, BillBatch, BillItem};

    let harness = Harness::new();

    let number = harness.store.allocate_bill_number().await.unwrap();
    let mut bill = Bill::draft(
        number,
        StudentId::new(),
        period(),
        today(),
        future_due(),
        "",
        &Actor::system(),
    );
    bill.push_item(BillItem::charge(
        CategoryId::new(),
        "Tuition Fees - Term 1",
        Money::new(dec!(5000.00)),
    ));
    bill.issue();
    let bill_id = bill.id;
    let record = domain_audit::AuditRecord::new(
        &Actor::system(),
        AuditAction::Create,
        domain_audit::EntityKind::Bill,
        *bill_id.as_uuid(),
        serde_json::json!({}),
    );
    harness
        .store
        .insert_bill(
            BillBatch {
                bill,
                consume_credits: Vec::new(),
                audit: record,
            },
            false,
        )
        .await
        .unwrap();

    let cancelled = harness
        .processor
        .cancel_bill(bill_id, &harness.actor)
        .await
        .unwrap();
    assert_eq!(cancelled.status.code(), "cancelled");

    let err = harness
        .pay(ChargeRef::Bill(bill_id), Money::new(dec!(100.00)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TargetNotAcceptingPayment { .. }
    ));

    // Cancelling twice is a conflict, and the trail records the cancel
    assert!(harness
        .processor
        .cancel_bill(bill_id, &harness.actor)
        .await
        .is_err());
    let entries = harness
        .store
        .entries_for_entity(domain_audit::EntityKind::Bill, *bill_id.as_uuid())
        .await
        .unwrap();
    assert!(entries.iter().any(|e| e.action == AuditAction::Cancel));
}

#[tokio::test]
async fn duplicate_receipt_numbers_are_rejected() {
    let harness = Harness::new();
    let target = harness.seed_fee(Money::new(dec!(900.00)), future_due()).await;

    let mut request = PaymentRequest::new(
        target,
        Money::new(dec!(100.00)),
        PaymentMode::Cash,
        today(),
    );
    request.receipt_number = Some("RCPT-0000000042".to_string());

    harness
        .processor
        .record_payment(request.clone(), &harness.actor, today())
        .await
        .unwrap();

    let err = harness
        .processor
        .record_payment(request, &harness.actor, today())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Store(_)));
    assert_eq!(
        harness.store.confirmed_payments(target).await.unwrap().len(),
        1
    );
}
