//! Audit trail port
//!
//! Mutating ledger operations persist their audit records through the same
//! store transaction that applies the mutation; this port exists for
//! standalone appends and for querying the trail. Implementations must keep
//! range-by-entity and range-by-time queries index-backed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use core_kernel::{DomainPort, PortError};

use crate::entry::{AuditLogEntry, AuditRecord, EntityKind};

/// Port for appending to and querying the audit trail
#[async_trait]
pub trait AuditPort: DomainPort {
    /// Appends one entry, assigning sequence and timestamp
    ///
    /// A failure here must abort whatever unit of work the caller is in;
    /// the ledger core never logs best-effort.
    async fn append(&self, record: AuditRecord) -> Result<AuditLogEntry, PortError>;

    /// All entries for one entity, ordered by sequence
    async fn entries_for_entity(
        &self,
        entity: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, PortError>;

    /// All entries in a closed time range, ordered by sequence
    async fn entries_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, PortError>;
}
