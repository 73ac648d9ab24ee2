//! Domain events for the ledger
//!
//! Status transitions that external systems care about (settlement and
//! delinquency) are emitted synchronously after a successful commit through
//! an explicit publisher, replacing implicit post-save hook chains. The core
//! never delivers notifications itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use core_kernel::{Money, StudentId};

use crate::charge::ChargeRef;

/// Domain events emitted by the payment processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A charge became fully paid
    ChargeSettled {
        student_id: StudentId,
        charge: ChargeRef,
        amount_paid: Money,
        timestamp: DateTime<Utc>,
    },

    /// A charge with money outstanding went past due
    ChargeOverdue {
        student_id: StudentId,
        charge: ChargeRef,
        balance: Money,
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// The student the event concerns
    pub fn student_id(&self) -> StudentId {
        match self {
            LedgerEvent::ChargeSettled { student_id, .. } => *student_id,
            LedgerEvent::ChargeOverdue { student_id, .. } => *student_id,
        }
    }

    /// The charge the event concerns
    pub fn charge(&self) -> ChargeRef {
        match self {
            LedgerEvent::ChargeSettled { charge, .. } => *charge,
            LedgerEvent::ChargeOverdue { charge, .. } => *charge,
        }
    }

    /// The event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ChargeSettled { .. } => "ChargeSettled",
            LedgerEvent::ChargeOverdue { .. } => "ChargeOverdue",
        }
    }
}

/// Subscriber boundary for ledger events
///
/// Publishing happens after the commit; a subscriber must not be able to
/// fail the financial mutation it is being told about.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: LedgerEvent);
}

/// Publisher that drops every event
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: LedgerEvent) {}
}

/// Publisher that buffers events in memory
///
/// Used by tests and by batch tools that forward events after a run.
#[derive(Default)]
pub struct BufferPublisher {
    events: Mutex<Vec<LedgerEvent>>,
}

impl BufferPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all buffered events
    pub fn drain(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events.lock().expect("event buffer poisoned"))
    }
}

impl EventPublisher for BufferPublisher {
    fn publish(&self, event: LedgerEvent) {
        self.events.lock().expect("event buffer poisoned").push(event);
    }
}
