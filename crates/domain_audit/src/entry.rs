//! Audit log entries
//!
//! Every financially significant state transition writes exactly one entry,
//! in the same unit of work as the mutation it describes. Entries are
//! append-only: once written they are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use core_kernel::{Actor, ActorId, ActorRole, AuditEntryId, Origin};

/// The kind of financial mutation being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Payment,
    Refund,
    Cancel,
    Confirm,
}

impl AuditAction {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Payment => "PAYMENT",
            AuditAction::Refund => "REFUND",
            AuditAction::Cancel => "CANCEL",
            AuditAction::Confirm => "CONFIRM",
        }
    }
}

/// The financial entity an entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Fee,
    Bill,
    Payment,
    FeeCategory,
    StudentCredit,
}

impl EntityKind {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            EntityKind::Fee => "fee",
            EntityKind::Bill => "bill",
            EntityKind::Payment => "payment",
            EntityKind::FeeCategory => "fee_category",
            EntityKind::StudentCredit => "student_credit",
        }
    }
}

/// A not-yet-persisted audit record
///
/// Built by the mutating service and handed to the store, which persists it
/// in the same transaction as the mutation and assigns the server-side
/// sequence and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Acting identity; None for system-initiated mutations
    pub actor_id: Option<ActorId>,
    /// Role the actor held at the boundary
    pub actor_role: ActorRole,
    /// What happened
    pub action: AuditAction,
    /// Which entity kind was mutated
    pub entity: EntityKind,
    /// The mutated entity's identifier
    pub entity_id: Uuid,
    /// Structured detail payload (amounts, statuses, references)
    pub detail: Value,
    /// Request origin, when the boundary captured one
    pub origin: Option<Origin>,
}

impl AuditRecord {
    /// Creates a record attributing `action` on `entity`/`entity_id` to `actor`
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity: EntityKind,
        entity_id: Uuid,
        detail: Value,
    ) -> Self {
        Self {
            actor_id: actor.id,
            actor_role: actor.role,
            action,
            entity,
            entity_id,
            detail,
            origin: actor.origin.clone(),
        }
    }
}

/// A persisted, immutable audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique identifier
    pub id: AuditEntryId,
    /// Store-assigned monotonic sequence, total order over all entries
    pub sequence: u64,
    /// Store-assigned timestamp
    pub timestamp: DateTime<Utc>,
    /// Acting identity; None for system-initiated mutations
    pub actor_id: Option<ActorId>,
    /// Role the actor held at the boundary
    pub actor_role: ActorRole,
    /// What happened
    pub action: AuditAction,
    /// Which entity kind was mutated
    pub entity: EntityKind,
    /// The mutated entity's identifier
    pub entity_id: Uuid,
    /// Structured detail payload
    pub detail: Value,
    /// Request origin, when captured
    pub origin: Option<Origin>,
}

impl AuditLogEntry {
    /// Materializes a record into an entry with store-assigned fields
    pub fn from_record(record: AuditRecord, sequence: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new_v7(),
            sequence,
            timestamp,
            actor_id: record.actor_id,
            actor_role: record.actor_role,
            action: record.action,
            entity: record.entity,
            entity_id: record.entity_id,
            detail: record.detail,
            origin: record.origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_carries_actor_attribution() {
        let actor = Actor::administrator(ActorId::new()).with_origin("192.168.1.9", "admin-ui");
        let record = AuditRecord::new(
            &actor,
            AuditAction::Payment,
            EntityKind::Fee,
            Uuid::new_v4(),
            json!({"amount": "3000.00"}),
        );

        assert_eq!(record.actor_id, actor.id);
        assert_eq!(record.actor_role, ActorRole::Administrator);
        assert_eq!(record.origin.unwrap().ip.as_deref(), Some("192.168.1.9"));
    }

    #[test]
    fn test_system_record_has_no_actor() {
        let record = AuditRecord::new(
            &Actor::system(),
            AuditAction::Create,
            EntityKind::Bill,
            Uuid::new_v4(),
            json!({}),
        );
        assert!(record.actor_id.is_none());
        assert_eq!(record.actor_role, ActorRole::System);
    }

    #[test]
    fn test_entry_from_record() {
        let record = AuditRecord::new(
            &Actor::system(),
            AuditAction::Create,
            EntityKind::Fee,
            Uuid::new_v4(),
            json!({"category": "TUITION"}),
        );
        let entity_id = record.entity_id;
        let entry = AuditLogEntry::from_record(record, 7, Utc::now());

        assert_eq!(entry.sequence, 7);
        assert_eq!(entry.entity_id, entity_id);
        assert_eq!(entry.detail["category"], "TUITION");
    }
}
