//! Student credit repository
//!
//! Reads only; consumption happens inside the ledger repository's insert
//! transactions so a credit is never marked used without its discount
//! landing.

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{DomainPort, PortError, StudentId};
use domain_discount::{CreditPort, StudentCredit};

use crate::error::port_err;
use crate::rows::credit_from_row;

/// PostgreSQL-backed student credits
#[derive(Debug, Clone)]
pub struct PgCreditRepository {
    pool: PgPool,
}

impl PgCreditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgCreditRepository {}

#[async_trait]
impl CreditPort for PgCreditRepository {
    async fn unused_credits(&self, student: StudentId) -> Result<Vec<StudentCredit>, PortError> {
        let rows = sqlx::query(
            "SELECT credit_id, student_id, amount, reason, created_at, is_used, used_at, \
             applied_to FROM student_credits \
             WHERE student_id = $1 AND NOT is_used ORDER BY created_at",
        )
        .bind(student.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        rows.iter()
            .map(|r| credit_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn insert_credit(&self, credit: StudentCredit) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO student_credits (credit_id, student_id, amount, reason, created_at, \
             is_used, used_at, applied_to) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(credit.id.as_uuid())
        .bind(credit.student_id.as_uuid())
        .bind(credit.amount.amount())
        .bind(&credit.reason)
        .bind(credit.created_at)
        .bind(credit.is_used)
        .bind(credit.used_at)
        .bind(credit.applied_to)
        .execute(&self.pool)
        .await
        .map_err(port_err)?;
        Ok(())
    }
}
