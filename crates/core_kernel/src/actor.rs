//! Actor identity for audit attribution
//!
//! Every mutating ledger call receives an already-authenticated actor,
//! resolved once at the boundary into a typed role. The core uses it only
//! for audit attribution; authorization stays with the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::ActorId;

/// The role an actor held when the call entered the ledger core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// System-initiated action (scheduled generation, gateway webhook)
    System,
    /// School administrator
    Administrator,
    /// Accounts office staff
    Accountant,
}

/// Request origin captured for audit purposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Source IP address, when known
    pub ip: Option<String>,
    /// User agent string, when known
    pub user_agent: Option<String>,
}

/// An authenticated actor as seen by the ledger core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque identity; None for system-initiated actions
    pub id: Option<ActorId>,
    /// Role resolved at the boundary
    pub role: ActorRole,
    /// Request origin, when available
    pub origin: Option<Origin>,
}

impl Actor {
    /// A system-initiated actor (no identity)
    pub fn system() -> Self {
        Self {
            id: None,
            role: ActorRole::System,
            origin: None,
        }
    }

    /// An administrator actor
    pub fn administrator(id: ActorId) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Administrator,
            origin: None,
        }
    }

    /// An accounts office actor
    pub fn accountant(id: ActorId) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Accountant,
            origin: None,
        }
    }

    /// Attaches a request origin
    pub fn with_origin(mut self, ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.origin = Some(Origin {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        });
        self
    }

    /// Returns true for system-initiated actors
    pub fn is_system(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{:?}:{}", self.role, id),
            None => write!(f, "system"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert!(actor.is_system());
        assert_eq!(actor.role, ActorRole::System);
        assert_eq!(actor.to_string(), "system");
    }

    #[test]
    fn test_actor_with_origin() {
        let actor = Actor::administrator(ActorId::new()).with_origin("10.0.0.7", "cli/1.0");
        let origin = actor.origin.unwrap();
        assert_eq!(origin.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(origin.user_agent.as_deref(), Some("cli/1.0"));
    }
}
