//! Database Infrastructure Layer
//!
//! PostgreSQL adapters for the ledger core ports, built on SQLx:
//!
//! - [`PgLedgerRepository`] - fees, bills, payments; composite atomic
//!   operations with `FOR UPDATE` row locks and advisory generation locks
//! - [`PgCatalogRepository`] - fee category catalog
//! - [`PgCreditRepository`] - student credits
//! - [`PgAuditRepository`] - append-only audit trail
//! - [`PgRosterRepository`] - roster lookups and the sibling flag
//!
//! The schema lives in `migrations/`; apply it with `sqlx migrate run` or
//! any migration runner before first use.

pub mod error;
pub mod pool;
pub mod repositories;
mod rows;

pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use repositories::{
    PgAuditRepository, PgCatalogRepository, PgCreditRepository, PgLedgerRepository,
    PgRosterRepository,
};
