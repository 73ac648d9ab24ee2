//! Ledger repository
//!
//! Implements the composite atomic operations of the ledger port. Payment
//! mutations take a `FOR UPDATE` lock on the target row so concurrent
//! payments against the same charge serialize; generation takes a
//! transaction-scoped advisory lock on (student, period) so the
//! skip-existing check and the insert are one atomic step. Audit rows ride
//! in the same transaction as the mutation they describe.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{
    AcademicPeriod, ActorId, BillId, CreditId, DomainPort, FeeId, PaymentId, PortError,
    StudentId,
};
use domain_audit::AuditRecord;
use domain_ledger::{
    Bill, BillBatch, Charge, ChargeRef, Fee, FeeBatch, InsertOutcome, LedgerPort, Payment,
    PaymentOutcome, StatusPolicy,
};

use crate::error::port_err;
use crate::repositories::audit::insert_audit_tx;
use crate::rows::{bill_from_row, bill_item_from_row, fee_from_row, payment_from_row};

/// PostgreSQL-backed fee/bill ledger
#[derive(Debug, Clone)]
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgLedgerRepository {}

const SELECT_FEE: &str = "SELECT fee_id, student_id, category_id, academic_year, term, \
     amount_payable, amount_paid, balance, status, due_date, recorded_by, date_recorded, \
     last_updated FROM fees";

const SELECT_BILL: &str = "SELECT bill_id, bill_number, student_id, academic_year, term, \
     issue_date, due_date, status, total_amount, amount_paid, balance, notes, recorded_by, \
     created_at, updated_at FROM bills";

const SELECT_PAYMENT: &str = "SELECT payment_id, target_kind, target_id, amount, mode, \
     payment_date, receipt_number, recorded_by, notes, bank_reference, is_confirmed, \
     confirmed_by, confirmed_at, created_at FROM payments";

async fn fetch_fee_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: FeeId,
    for_update: bool,
) -> Result<Fee, PortError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query(&format!("{} WHERE fee_id = $1{}", SELECT_FEE, lock))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(port_err)?
        .ok_or_else(|| PortError::not_found("Fee", id))?;
    Ok(fee_from_row(&row)?)
}

async fn fetch_bill_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: BillId,
) -> Result<Vec<domain_ledger::BillItem>, PortError> {
    let rows = sqlx::query(
        "SELECT item_id, category_id, description, amount FROM bill_items \
         WHERE bill_id = $1 ORDER BY position",
    )
    .bind(id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(port_err)?;
    rows.iter()
        .map(|r| bill_item_from_row(r).map_err(Into::into))
        .collect()
}

async fn fetch_bill_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: BillId,
    for_update: bool,
) -> Result<Bill, PortError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query(&format!("{} WHERE bill_id = $1{}", SELECT_BILL, lock))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(port_err)?
        .ok_or_else(|| PortError::not_found("Bill", id))?;
    let items = fetch_bill_items_tx(tx, id).await?;
    Ok(bill_from_row(&row, items)?)
}

async fn fetch_charge_tx(
    tx: &mut Transaction<'_, Postgres>,
    target: ChargeRef,
    for_update: bool,
) -> Result<Charge, PortError> {
    match target {
        ChargeRef::Fee(id) => Ok(Charge::Fee(fetch_fee_tx(tx, id, for_update).await?)),
        ChargeRef::Bill(id) => Ok(Charge::Bill(fetch_bill_tx(tx, id, for_update).await?)),
    }
}

async fn fetch_confirmed_tx(
    tx: &mut Transaction<'_, Postgres>,
    target: ChargeRef,
) -> Result<Vec<Payment>, PortError> {
    let rows = sqlx::query(&format!(
        "{} WHERE target_kind = $1 AND target_id = $2 AND is_confirmed ORDER BY created_at",
        SELECT_PAYMENT
    ))
    .bind(target.entity_kind().code())
    .bind(target.entity_id())
    .fetch_all(&mut **tx)
    .await
    .map_err(port_err)?;
    rows.iter()
        .map(|r| payment_from_row(r).map_err(Into::into))
        .collect()
}

async fn insert_payment_tx(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> Result<(), PortError> {
    sqlx::query(
        "INSERT INTO payments (payment_id, target_kind, target_id, amount, mode, payment_date, \
         receipt_number, recorded_by, notes, bank_reference, is_confirmed, confirmed_by, \
         confirmed_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(payment.id.as_uuid())
    .bind(payment.target.entity_kind().code())
    .bind(payment.target.entity_id())
    .bind(payment.amount.amount())
    .bind(payment.mode.code())
    .bind(payment.payment_date)
    .bind(&payment.receipt_number)
    .bind(payment.recorded_by.map(|id| *id.as_uuid()))
    .bind(&payment.notes)
    .bind(&payment.bank_reference)
    .bind(payment.is_confirmed)
    .bind(payment.confirmed_by.map(|id| *id.as_uuid()))
    .bind(payment.confirmed_at)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(port_err)?;
    Ok(())
}

async fn insert_fee_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    fee: &Fee,
) -> Result<(), PortError> {
    sqlx::query(
        "INSERT INTO fees (fee_id, student_id, category_id, academic_year, term, \
         amount_payable, amount_paid, balance, status, due_date, recorded_by, date_recorded, \
         last_updated) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(fee.id.as_uuid())
    .bind(fee.student_id.as_uuid())
    .bind(fee.category_id.as_uuid())
    .bind(fee.academic_year.to_string())
    .bind(fee.term.number() as i16)
    .bind(fee.amount_payable.amount())
    .bind(fee.amount_paid.amount())
    .bind(fee.balance.amount())
    .bind(fee.status.code())
    .bind(fee.due_date)
    .bind(fee.recorded_by.map(|id| *id.as_uuid()))
    .bind(fee.date_recorded)
    .bind(fee.last_updated)
    .execute(&mut **tx)
    .await
    .map_err(port_err)?;
    Ok(())
}

async fn insert_bill_rows_tx(
    tx: &mut Transaction<'_, Postgres>,
    bill: &Bill,
) -> Result<(), PortError> {
    sqlx::query(
        "INSERT INTO bills (bill_id, bill_number, student_id, academic_year, term, issue_date, \
         due_date, status, total_amount, amount_paid, balance, notes, recorded_by, created_at, \
         updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(bill.id.as_uuid())
    .bind(&bill.bill_number)
    .bind(bill.student_id.as_uuid())
    .bind(bill.academic_year.to_string())
    .bind(bill.term.number() as i16)
    .bind(bill.issue_date)
    .bind(bill.due_date)
    .bind(bill.status.code())
    .bind(bill.total_amount.amount())
    .bind(bill.amount_paid.amount())
    .bind(bill.balance.amount())
    .bind(&bill.notes)
    .bind(bill.recorded_by.map(|id| *id.as_uuid()))
    .bind(bill.created_at)
    .bind(bill.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(port_err)?;

    for (position, item) in bill.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO bill_items (item_id, bill_id, category_id, description, amount, \
             position) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id.as_uuid())
        .bind(bill.id.as_uuid())
        .bind(item.category_id.map(|id| *id.as_uuid()))
        .bind(&item.description)
        .bind(item.amount.amount())
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    }
    Ok(())
}

async fn update_charge_tx(
    tx: &mut Transaction<'_, Postgres>,
    charge: &Charge,
) -> Result<(), PortError> {
    match charge {
        Charge::Fee(fee) => {
            sqlx::query(
                "UPDATE fees SET amount_paid = $2, balance = $3, status = $4, last_updated = $5 \
                 WHERE fee_id = $1",
            )
            .bind(fee.id.as_uuid())
            .bind(fee.amount_paid.amount())
            .bind(fee.balance.amount())
            .bind(fee.status.code())
            .bind(fee.last_updated)
            .execute(&mut **tx)
            .await
            .map_err(port_err)?;
        }
        Charge::Bill(bill) => {
            sqlx::query(
                "UPDATE bills SET amount_paid = $2, balance = $3, status = $4, updated_at = $5 \
                 WHERE bill_id = $1",
            )
            .bind(bill.id.as_uuid())
            .bind(bill.amount_paid.amount())
            .bind(bill.balance.amount())
            .bind(bill.status.code())
            .bind(bill.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(port_err)?;
        }
    }
    Ok(())
}

/// Marks credits used inside the generation transaction
///
/// The `AND NOT is_used` guard makes concurrent consumption of the same
/// credit impossible: the second transaction affects zero rows and aborts.
async fn consume_credits_tx(
    tx: &mut Transaction<'_, Postgres>,
    credit_ids: &[CreditId],
    applied_to: Uuid,
) -> Result<(), PortError> {
    for id in credit_ids {
        let result = sqlx::query(
            "UPDATE student_credits SET is_used = TRUE, used_at = now(), applied_to = $2 \
             WHERE credit_id = $1 AND NOT is_used",
        )
        .bind(id.as_uuid())
        .bind(applied_to)
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;

        if result.rows_affected() != 1 {
            return Err(PortError::conflict(format!(
                "credit {} already consumed",
                id
            )));
        }
    }
    Ok(())
}

/// Serializes generation for one (student, period) pair within a transaction
async fn lock_generation_tx(
    tx: &mut Transaction<'_, Postgres>,
    student: StudentId,
    period: &AcademicPeriod,
) -> Result<(), PortError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("charge-generation:{}:{}", student, period))
        .execute(&mut **tx)
        .await
        .map_err(port_err)?;
    Ok(())
}

#[async_trait]
impl LedgerPort for PgLedgerRepository {
    async fn fee(&self, id: FeeId) -> Result<Fee, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        let fee = fetch_fee_tx(&mut tx, id, false).await?;
        tx.commit().await.map_err(port_err)?;
        Ok(fee)
    }

    async fn bill(&self, id: BillId) -> Result<Bill, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        let bill = fetch_bill_tx(&mut tx, id, false).await?;
        tx.commit().await.map_err(port_err)?;
        Ok(bill)
    }

    async fn charge(&self, target: ChargeRef) -> Result<Charge, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        let charge = fetch_charge_tx(&mut tx, target, false).await?;
        tx.commit().await.map_err(port_err)?;
        Ok(charge)
    }

    async fn payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        let row = sqlx::query(&format!("{} WHERE payment_id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(port_err)?
            .ok_or_else(|| PortError::not_found("Payment", id))?;
        Ok(payment_from_row(&row)?)
    }

    async fn confirmed_payments(&self, target: ChargeRef) -> Result<Vec<Payment>, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        let payments = fetch_confirmed_tx(&mut tx, target).await?;
        tx.commit().await.map_err(port_err)?;
        Ok(payments)
    }

    async fn allocate_bill_number(&self) -> Result<String, PortError> {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('bill_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(port_err)?;
        Ok(format!("BILL{}{:06}", Utc::now().year(), seq))
    }

    async fn insert_fees(
        &self,
        batch: FeeBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        lock_generation_tx(&mut tx, batch.student_id, &batch.period).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fees WHERE student_id = $1 AND academic_year = $2 \
             AND term = $3)",
        )
        .bind(batch.student_id.as_uuid())
        .bind(batch.period.year.to_string())
        .bind(batch.period.term.number() as i16)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_err)?;

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
        consume_credits_tx(&mut tx, &batch.consume_credits, applied_to).await?;

        for fee in &batch.fees {
            insert_fee_row_tx(&mut tx, fee).await?;
        }
        for record in &batch.audit {
            insert_audit_tx(&mut tx, record).await?;
        }

        tx.commit().await.map_err(port_err)?;
        debug!(student = %batch.student_id, period = %batch.period, created = batch.fees.len(), "fees inserted");
        Ok(InsertOutcome {
            created: batch.fees.len(),
            skipped_existing: false,
        })
    }

    async fn insert_fee(&self, fee: Fee, audit: AuditRecord) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        // The unique index on (student, category, year, term) turns a
        // concurrent duplicate into a constraint conflict
        insert_fee_row_tx(&mut tx, &fee).await?;
        insert_audit_tx(&mut tx, &audit).await?;
        tx.commit().await.map_err(port_err)?;
        Ok(())
    }

    async fn insert_bill(
        &self,
        batch: BillBatch,
        skip_existing: bool,
    ) -> Result<InsertOutcome, PortError> {
        let bill = batch.bill;
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        lock_generation_tx(&mut tx, bill.student_id, &bill.period()).await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bills WHERE student_id = $1 AND academic_year = $2 \
             AND term = $3)",
        )
        .bind(bill.student_id.as_uuid())
        .bind(bill.academic_year.to_string())
        .bind(bill.term.number() as i16)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_err)?;

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

        consume_credits_tx(&mut tx, &batch.consume_credits, *bill.id.as_uuid()).await?;
        insert_bill_rows_tx(&mut tx, &bill).await?;
        insert_audit_tx(&mut tx, &batch.audit).await?;

        tx.commit().await.map_err(port_err)?;
        debug!(bill = %bill.id, number = %bill.bill_number, "bill inserted");
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
        let mut tx = self.pool.begin().await.map_err(port_err)?;

        // Row lock: concurrent payments against the same charge serialize here
        let mut charge = fetch_charge_tx(&mut tx, payment.target, true).await?;
        if !charge.accepts_payment() {
            return Err(PortError::conflict(format!(
                "charge {} is not accepting payments",
                payment.target
            )));
        }
        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        insert_payment_tx(&mut tx, &payment).await?;

        // Re-read inside the same transaction; never trust a running counter
        let confirmed = fetch_confirmed_tx(&mut tx, payment.target).await?;
        charge.recompute(&confirmed, policy, today);
        update_charge_tx(&mut tx, &charge).await?;
        insert_audit_tx(&mut tx, &audit).await?;

        tx.commit().await.map_err(port_err)?;
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
        let mut tx = self.pool.begin().await.map_err(port_err)?;

        let row = sqlx::query(&format!(
            "{} WHERE payment_id = $1 FOR UPDATE",
            SELECT_PAYMENT
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(port_err)?
        .ok_or_else(|| PortError::not_found("Payment", id))?;
        let mut payment = payment_from_row(&row)?;
        if payment.is_confirmed {
            return Err(PortError::conflict(format!(
                "payment {} is already confirmed",
                id
            )));
        }

        let mut charge = fetch_charge_tx(&mut tx, payment.target, true).await?;
        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        payment.confirm(confirmed_by, Utc::now());
        sqlx::query(
            "UPDATE payments SET is_confirmed = TRUE, confirmed_by = $2, confirmed_at = $3 \
             WHERE payment_id = $1",
        )
        .bind(id.as_uuid())
        .bind(payment.confirmed_by.map(|a| *a.as_uuid()))
        .bind(payment.confirmed_at)
        .execute(&mut *tx)
        .await
        .map_err(port_err)?;

        let confirmed = fetch_confirmed_tx(&mut tx, payment.target).await?;
        charge.recompute(&confirmed, policy, today);
        update_charge_tx(&mut tx, &charge).await?;
        insert_audit_tx(&mut tx, &audit).await?;

        tx.commit().await.map_err(port_err)?;
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
        let mut tx = self.pool.begin().await.map_err(port_err)?;

        let row = sqlx::query(&format!(
            "{} WHERE payment_id = $1 FOR UPDATE",
            SELECT_PAYMENT
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(port_err)?
        .ok_or_else(|| PortError::not_found("Payment", id))?;
        let payment = payment_from_row(&row)?;

        let mut charge = fetch_charge_tx(&mut tx, payment.target, true).await?;
        let previously_settled = charge.is_settled();
        let previously_overdue = charge.is_overdue();

        sqlx::query("DELETE FROM payments WHERE payment_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;

        let confirmed = fetch_confirmed_tx(&mut tx, payment.target).await?;
        charge.recompute(&confirmed, policy, today);
        update_charge_tx(&mut tx, &charge).await?;
        insert_audit_tx(&mut tx, &audit).await?;

        tx.commit().await.map_err(port_err)?;
        Ok(PaymentOutcome {
            payment,
            charge,
            previously_settled,
            previously_overdue,
        })
    }

    async fn cancel_bill(&self, id: BillId, audit: AuditRecord) -> Result<Bill, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;

        let mut bill = fetch_bill_tx(&mut tx, id, true).await?;
        if !bill.cancel() {
            return Err(PortError::conflict(format!(
                "bill {} is already cancelled",
                id
            )));
        }

        sqlx::query("UPDATE bills SET status = $2, updated_at = $3 WHERE bill_id = $1")
            .bind(id.as_uuid())
            .bind(bill.status.code())
            .bind(bill.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(port_err)?;
        insert_audit_tx(&mut tx, &audit).await?;

        tx.commit().await.map_err(port_err)?;
        Ok(bill)
    }

    async fn charges_for_period(
        &self,
        period: &AcademicPeriod,
    ) -> Result<Vec<Charge>, PortError> {
        let year = period.year.to_string();
        let term = period.term.number() as i16;

        let fee_rows = sqlx::query(&format!(
            "{} WHERE academic_year = $1 AND term = $2 ORDER BY date_recorded",
            SELECT_FEE
        ))
        .bind(&year)
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        let mut charges: Vec<Charge> = fee_rows
            .iter()
            .map(|r| fee_from_row(r).map(Charge::Fee).map_err(PortError::from))
            .collect::<Result<_, _>>()?;

        let bill_rows = sqlx::query(&format!(
            "{} WHERE academic_year = $1 AND term = $2 ORDER BY created_at",
            SELECT_BILL
        ))
        .bind(&year)
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        let mut tx = self.pool.begin().await.map_err(port_err)?;
        for row in &bill_rows {
            let id: Uuid = row.try_get("bill_id").map_err(port_err)?;
            let items = fetch_bill_items_tx(&mut tx, id.into()).await?;
            charges.push(Charge::Bill(bill_from_row(row, items)?));
        }
        tx.commit().await.map_err(port_err)?;

        Ok(charges)
    }

    async fn outstanding_charges(&self) -> Result<Vec<Charge>, PortError> {
        let fee_rows = sqlx::query(&format!("{} WHERE balance > 0", SELECT_FEE))
            .fetch_all(&self.pool)
            .await
            .map_err(port_err)?;

        let mut charges: Vec<Charge> = fee_rows
            .iter()
            .map(|r| fee_from_row(r).map(Charge::Fee).map_err(PortError::from))
            .collect::<Result<_, _>>()?;

        let bill_rows = sqlx::query(&format!(
            "{} WHERE balance > 0 AND status NOT IN ('cancelled', 'refunded')",
            SELECT_BILL
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        let mut tx = self.pool.begin().await.map_err(port_err)?;
        for row in &bill_rows {
            let id: Uuid = row.try_get("bill_id").map_err(port_err)?;
            let items = fetch_bill_items_tx(&mut tx, id.into()).await?;
            charges.push(Charge::Bill(bill_from_row(row, items)?));
        }
        tx.commit().await.map_err(port_err)?;

        Ok(charges)
    }
}
