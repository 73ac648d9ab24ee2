//! In-memory reference adapter
//!
//! Implements every port the ledger core needs against a single
//! mutex-guarded state. The coarse lock gives the serialization the ports
//! require for free: each composite operation validates, appends its audit
//! entries, and commits while holding the lock, so a failure leaves nothing
//! partially applied. The PostgreSQL adapter in `infra_db` provides the
//! row-level-locking equivalent for production; this adapter backs the test
//! suite and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use core_kernel::{
    AcademicPeriod, ActorId, BillId, CategoryId, ClassLevel, DomainPort, FeeId, PaymentId,
    PortError, StudentId, StudentRef,
};
use domain_audit::{AuditLogEntry, AuditPort, AuditRecord, EntityKind};
use domain_catalog::{CatalogPort, FeeCategory};
use domain_discount::{CreditPort, SiblingPolicy, StudentCredit};

use crate::bill::Bill;
use crate::charge::{Charge, ChargeRef};
use crate::fee::Fee;
use crate::payment::Payment;
use crate::ports::{
    BillBatch, FeeBatch, InsertOutcome, LedgerPort, PaymentOutcome, RosterPort,
};
use crate::status::StatusPolicy;

#[derive(Default)]
struct State {
    students: Vec<StudentRef>,
    siblings: HashSet<StudentId>,
    categories: Vec<FeeCategory>,
    fees: HashMap<FeeId, Fee>,
    bills: HashMap<BillId, Bill>,
    payments: HashMap<PaymentId, Payment>,
    credits: Vec<StudentCredit>,
    audit: Vec<AuditLogEntry>,
    audit_seq: u64,
    bill_seq: u64,
    receipts: HashSet<String>,
    audit_fault: bool,
}

/// In-memory store implementing all ledger core ports
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a roster entry
    pub fn add_student(&self, student: StudentRef) {
        self.lock().students.push(student);
    }

    /// Marks a student as having an enrolled sibling
    pub fn set_has_sibling(&self, student: StudentId) {
        self.lock().siblings.insert(student);
    }

    /// Seeds catalog categories
    pub fn seed_categories(&self, categories: impl IntoIterator<Item = FeeCategory>) {
        self.lock().categories.extend(categories);
    }

    /// Makes the next audit append fail (test hook for rollback behavior)
    pub fn inject_audit_fault(&self) {
        self.lock().audit_fault = true;
    }

    /// Number of audit entries written so far
    pub fn audit_len(&self) -> usize {
        self.lock().audit.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("in-memory ledger state poisoned")
    }
}

impl DomainPort for InMemoryLedger {}

/// Appends one audit entry, honoring the injected fault
fn append_audit(state: &mut State, record: AuditRecord) -> Result<AuditLogEntry, PortError> {
    if state.audit_fault {
        state.audit_fault = false;
        return Err(PortError::audit_write_failed("injected audit fault"));
    }
    state.audit_seq += 1;
    let entry = AuditLogEntry::from_record(record, state.audit_seq, Utc::now());
    state.audit.push(entry.clone());
    Ok(entry)
}

/// Appends a batch of audit entries all-or-nothing
fn append_audit_batch(state: &mut State, records: Vec<AuditRecord>) -> Result<(), PortError> {
    if state.audit_fault {
        state.audit_fault = false;
        return Err(PortError::audit_write_failed("injected audit fault"));
    }
    let now = Utc::now();
    for record in records {
        state.audit_seq += 1;
        state
            .audit
            .push(AuditLogEntry::from_record(record, state.audit_seq, now));
    }
    Ok(())
}

fn charge_of(state: &State, target: ChargeRef) -> Result<Charge, PortError> {
    match target {
        ChargeRef::Fee(id) => state
            .fees
            .get(&id)
            .cloned()
            .map(Charge::Fee)
            .ok_or_else(|| PortError::not_found("Fee", id)),
        ChargeRef::Bill(id) => state
            .bills
            .get(&id)
            .cloned()
            .map(Charge::Bill)
            .ok_or_else(|| PortError::not_found("Bill", id)),
    }
}

fn confirmed_payments_of(state: &State, target: ChargeRef) -> Vec<Payment> {
    let mut payments: Vec<Payment> = state
        .payments
        .values()
        .filter(|p| p.target == target && p.is_confirmed)
        .cloned()
        .collect();
    payments.sort_by_key(|p| p.created_at);
    payments
}

fn store_charge(state: &mut State, charge: &Charge) {
    match charge {
        Charge::Fee(fee) => {
            state.fees.insert(fee.id, fee.clone());
        }
        Charge::Bill(bill) => {
            state.bills.insert(bill.id, bill.clone());
        }
    }
}

fn consume_credits(
    state: &mut State,
    credit_ids: &[core_kernel::CreditId],
    applied_to: Uuid,
) -> Result<(), PortError> {
    // Validate first so a used credit aborts before any mutation
    for id in credit_ids {
        let credit = state
            .credits
            .iter()
            .find(|c| c.id == *id)
            .ok_or_else(|| PortError::not_found("StudentCredit", id))?;
        if credit.is_used {
            return Err(PortError::conflict(format!(
                "credit {} already consumed",
                id
            )));
        }
    }
    let now = Utc::now();
    for id in credit_ids {
        if let Some(credit) = state.credits.iter_mut().find(|c| c.id == *id) {
            credit.mark_used(applied_to, now);
        }
    }
    Ok(())
}

#[async_trait]
impl RosterPort for InMemoryLedger {
    async fn active_students(
        &self,
        class_levels: &[ClassLevel],
    ) -> Result<Vec<StudentRef>, PortError> {
        let state = self.lock();
        Ok(state
            .students
            .iter()
            .filter(|s| class_levels.is_empty() || class_levels.contains(&s.class_level))
            .copied()
            .collect())
    }
}

#[async_trait]
impl SiblingPolicy for InMemoryLedger {
    async fn has_enrolled_sibling(&self, student: StudentId) -> Result<bool, PortError> {
        Ok(self.lock().siblings.contains(&student))
    }
}

#[async_trait]
impl CatalogPort for InMemoryLedger {
    async fn category(&self, id: CategoryId) -> Result<FeeCategory, PortError> {
        self.lock()
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| PortError::not_found("FeeCategory", id))
    }

    async fn active_categories(&self) -> Result<Vec<FeeCategory>, PortError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn active_mandatory_categories(&self) -> Result<Vec<FeeCategory>, PortError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active && c.is_mandatory)
            .cloned()
            .collect())
    }

    async fn insert_category(&self, category: FeeCategory) -> Result<(), PortError> {
        let mut state = self.lock();
        if state.categories.iter().any(|c| c.id == category.id) {
            return Err(PortError::conflict(format!(
                "category {} already exists",
                category.id
            )));
        }
        state.categories.push(category);
        Ok(())
    }

    async fn set_category_active(&self, id: CategoryId, active: bool) -> Result<(), PortError> {
        let mut state = self.lock();
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PortError::not_found("FeeCategory", id))?;
        category.set_active(active);
        Ok(())
    }
}

#[async_trait]
impl CreditPort for InMemoryLedger {
    async fn unused_credits(&self, student: StudentId) -> Result<Vec<StudentCredit>, PortError> {
        Ok(self
            .lock()
            .credits
            .iter()
            .filter(|c| c.student_id == student && !c.is_used)
            .cloned()
            .collect())
    }

    async fn insert_credit(&self, credit: StudentCredit) -> Result<(), PortError> {
        self.lock().credits.push(credit);
        Ok(())
    }
}

#[async_trait]
impl AuditPort for InMemoryLedger {
    async fn append(&self, record: AuditRecord) -> Result<AuditLogEntry, PortError> {
        append_audit(&mut self.lock(), record)
    }

    async fn entries_for_entity(
        &self,
        entity: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, PortError> {
        Ok(self
            .lock()
            .audit
            .iter()
            .filter(|e| e.entity == entity && e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn entries_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, PortError> {
        Ok(self
            .lock()
            .audit
            .iter()
            .filter(|e| e.timestamp >= from && e.timestamp <= to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn fee(&self, id: FeeId) -> Result<Fee, PortError> {
        self.lock()
            .fees
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Fee", id))
    }

    async fn bill(&self, id: BillId) -> Result<Bill, PortError> {
        self.lock()
            .bills
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Bill", id))
    }

    async fn charge(&self, target: ChargeRef) -> Result<Charge, PortError> {
        charge_of(&self.lock(), target)
    }

    async fn payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        self.lock()
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))
    }

    async fn confirmed_payments(&self, target: ChargeRef) -> Result<Vec<Payment>, PortError> {
        Ok(confirmed_payments_of(&self.lock(), target))
    }

    async fn allocate_bill_number(&self) -> Result<String, PortError> {
        let mut state = self.lock();
        state.bill_seq += 1;
        Ok(format!("BILL{}{:06}", Utc::now().year(), state.bill_seq))
    }

    async fn insert_fees(
        &self,
        batch: FeeBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError> {
        let mut state = self.lock();

        let exists = state
            .fees
            .values()
            .any(|f| f.student_id == batch.student_id && f.period() == batch.period);
        if exists {
            if skip_existing {
                return Ok(InsertOutcome {
                    created: 0,
                    skipped_existing: true,
                });
            }
            return Err(PortError::conflict(format!(
                "fees already exist for student {} in {}",
                batch.student_id, batch.period
            )));
        }

        let applied_to = batch
            .fees
            .first()
            .map(|f| *f.id.as_uuid())
            .unwrap_or_default();
        consume_credits(&mut state, &batch.consume_credits, applied_to)?;
        append_audit_batch(&mut state, batch.audit)?;

        let created = batch.fees.len();
        for fee in batch.fees {
            state.fees.insert(fee.id, fee);
        }
        Ok(InsertOutcome {
            created,
            skipped_existing: false,
        })
    }

    async fn insert_fee(&self, fee: Fee, audit: AuditRecord) -> Result<(), PortError> {
        let mut state = self.lock();

        let duplicate = state.fees.values().any(|f| {
            f.student_id == fee.student_id
                && f.category_id == fee.category_id
                && f.period() == fee.period()
        });
        if duplicate {
            return Err(PortError::conflict(format!(
                "fee for category {} already exists for student {} in {}",
                fee.category_id,
                fee.student_id,
                fee.period()
            )));
        }

        append_audit(&mut state, audit)?;
        state.fees.insert(fee.id, fee);
        Ok(())
    }

    async fn insert_bill(
        &self,
        batch: BillBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError> {
        let mut state = self.lock();
        let bill = batch.bill;

        let exists = state
            .bills
            .values()
            .any(|b| b.student_id == bill.student_id && b.period() == bill.period());
        if exists {
            if skip_existing {
                return Ok(InsertOutcome {
                    created: 0,
                    skipped_existing: true,
                });
            }
            return Err(PortError::conflict(format!(
                "bill already exists for student {} in {}",
                bill.student_id,
                bill.period()
            )));
        }
        if state
            .bills
            .values()
            .any(|b| b.bill_number == bill.bill_number)
        {
            return Err(PortError::conflict(format!(
                "bill number {} already allocated",
                bill.bill_number
            )));
        }

        consume_credits(&mut state, &batch.consume_credits, *bill.id.as_uuid())?;
        append_audit_batch(&mut state, vec![batch.audit])?;

        state.bills.insert(bill.id, bill);
        Ok(InsertOutcome {
            created: 1,
            skipped_existing: false,
        })
    }

    async fn apply_payment(
        &self,
        payment: Payment,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError> {
        let mut state = self.lock();

        if state.receipts.contains(&payment.receipt_number) {
            return Err(PortError::conflict(format!(
                "receipt number {} already used",
                payment.receipt_number
            )));
        }

        let mut charge = charge_of(&state, payment.target)?;
        if !charge.accepts_payment() {
            return Err(PortError::conflict(format!(
                "charge {} is not accepting payments",
                payment.target
            )));
        }

        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        // Recompute from the confirmed payments as they will be once this
        // payment is committed
        let mut confirmed = confirmed_payments_of(&state, payment.target);
        if payment.is_confirmed {
            confirmed.push(payment.clone());
        }
        charge.recompute(&confirmed, policy, today);

        append_audit(&mut state, audit)?;

        state.receipts.insert(payment.receipt_number.clone());
        state.payments.insert(payment.id, payment.clone());
        store_charge(&mut state, &charge);

        Ok(PaymentOutcome {
            payment,
            charge,
            previously_settled,
            previously_overdue,
        })
    }

    async fn confirm_payment(
        &self,
        id: PaymentId,
        confirmed_by: Option<ActorId>,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError> {
        let mut state = self.lock();

        let mut payment = state
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))?;
        if payment.is_confirmed {
            return Err(PortError::conflict(format!(
                "payment {} is already confirmed",
                id
            )));
        }
        payment.confirm(confirmed_by, Utc::now());

        let mut charge = charge_of(&state, payment.target)?;
        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        let mut confirmed = confirmed_payments_of(&state, payment.target);
        confirmed.push(payment.clone());
        charge.recompute(&confirmed, policy, today);

        append_audit(&mut state, audit)?;

        state.payments.insert(payment.id, payment.clone());
        store_charge(&mut state, &charge);

        Ok(PaymentOutcome {
            payment,
            charge,
            previously_settled,
            previously_overdue,
        })
    }

    async fn delete_payment(
        &self,
        id: PaymentId,
        policy: &StatusPolicy,
        today: NaiveDate,
        audit: AuditRecord,
    ) -> Result<PaymentOutcome, PortError> {
        let mut state = self.lock();

        let payment = state
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Payment", id))?;

        let mut charge = charge_of(&state, payment.target)?;
        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        let confirmed: Vec<Payment> = confirmed_payments_of(&state, payment.target)
            .into_iter()
            .filter(|p| p.id != id)
            .collect();
        charge.recompute(&confirmed, policy, today);

        append_audit(&mut state, audit)?;

        state.payments.remove(&id);
        state.receipts.remove(&payment.receipt_number);
        store_charge(&mut state, &charge);

        Ok(PaymentOutcome {
            payment,
            charge,
            previously_settled,
            previously_overdue,
        })
    }

    async fn cancel_bill(&self, id: BillId, audit: AuditRecord) -> Result<Bill, PortError> {
        let mut state = self.lock();

        let mut bill = state
            .bills
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Bill", id))?;
        if !bill.cancel() {
            return Err(PortError::conflict(format!(
                "bill {} is already cancelled",
                id
            )));
        }

        append_audit(&mut state, audit)?;
        state.bills.insert(bill.id, bill.clone());
        Ok(bill)
    }

    async fn charges_for_period(
        &self,
        period: &AcademicPeriod,
    ) -> Result<Vec<Charge>, PortError> {
        let state = self.lock();
        let mut charges: Vec<Charge> = state
            .fees
            .values()
            .filter(|f| f.period() == *period)
            .cloned()
            .map(Charge::Fee)
            .collect();
        charges.extend(
            state
                .bills
                .values()
                .filter(|b| b.period() == *period)
                .cloned()
                .map(Charge::Bill),
        );
        Ok(charges)
    }

    async fn outstanding_charges(&self) -> Result<Vec<Charge>, PortError> {
        let state = self.lock();
        let mut charges: Vec<Charge> = state
            .fees
            .values()
            .filter(|f| f.balance.is_positive())
            .cloned()
            .map(Charge::Fee)
            .collect();
        charges.extend(
            state
                .bills
                .values()
                .filter(|b| b.balance.is_positive() && !b.status.is_terminal())
                .cloned()
                .map(Charge::Bill),
        );
        Ok(charges)
    }
}
