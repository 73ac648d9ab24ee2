//! Audit trail repository
//!
//! Append and range queries over the audit log. The composite ledger
//! operations write their entries inside their own transactions via
//! `insert_audit_tx`; this repository serves standalone appends and reads.
//! Both range queries are backed by the (entity_type, entity_id) and
//! timestamp indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{DomainPort, PortError};
use domain_audit::{AuditLogEntry, AuditPort, AuditRecord, EntityKind};

use crate::error::port_err;
use crate::rows::{actor_role_code, audit_entry_from_row};

/// PostgreSQL-backed audit trail
#[derive(Debug, Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgAuditRepository {}

const SELECT_ENTRY: &str = "SELECT entry_id, seq, ts, actor_id, actor_role, action, \
     entity_type, entity_id, detail, origin_ip, origin_agent FROM audit_log";

/// Inserts one audit record inside an open transaction
///
/// Errors are mapped to `PortError::AuditWriteFailed` so callers roll back
/// the financial mutation the entry was describing.
pub(crate) async fn insert_audit_tx(
    tx: &mut Transaction<'_, Postgres>,
    record: &AuditRecord,
) -> Result<(), PortError> {
    let (origin_ip, origin_agent) = match &record.origin {
        Some(origin) => (origin.ip.clone(), origin.user_agent.clone()),
        None => (None, None),
    };

    sqlx::query(
        "INSERT INTO audit_log (entry_id, ts, actor_id, actor_role, action, entity_type, \
         entity_id, detail, origin_ip, origin_agent) \
         VALUES ($1, now(), $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(Uuid::now_v7())
    .bind(record.actor_id.map(|id| *id.as_uuid()))
    .bind(actor_role_code(record.actor_role))
    .bind(record.action.code())
    .bind(record.entity.code())
    .bind(record.entity_id)
    .bind(&record.detail)
    .bind(origin_ip)
    .bind(origin_agent)
    .execute(&mut **tx)
    .await
    .map_err(|e| PortError::audit_write_failed(e.to_string()))?;

    Ok(())
}

#[async_trait]
impl AuditPort for PgAuditRepository {
    async fn append(&self, record: AuditRecord) -> Result<AuditLogEntry, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_err)?;
        insert_audit_tx(&mut tx, &record).await?;

        // Read the entry back for its server-assigned sequence and timestamp
        let row = sqlx::query(&format!(
            "{} WHERE entity_type = $1 AND entity_id = $2 ORDER BY seq DESC LIMIT 1",
            SELECT_ENTRY
        ))
        .bind(record.entity.code())
        .bind(record.entity_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_err)?;
        tx.commit().await.map_err(port_err)?;

        Ok(audit_entry_from_row(&row)?)
    }

    async fn entries_for_entity(
        &self,
        entity: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, PortError> {
        let rows = sqlx::query(&format!(
            "{} WHERE entity_type = $1 AND entity_id = $2 ORDER BY seq",
            SELECT_ENTRY
        ))
        .bind(entity.code())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        rows.iter()
            .map(|r| audit_entry_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn entries_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, PortError> {
        let rows = sqlx::query(&format!(
            "{} WHERE ts >= $1 AND ts <= $2 ORDER BY seq",
            SELECT_ENTRY
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;

        rows.iter()
            .map(|r| audit_entry_from_row(r).map_err(Into::into))
            .collect()
    }
}
