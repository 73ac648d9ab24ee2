//! PostgreSQL adapters for the ledger core ports

pub mod audit;
pub mod catalog;
pub mod credit;
pub mod ledger;
pub mod roster;

pub use audit::PgAuditRepository;
pub use catalog::PgCatalogRepository;
pub use credit::PgCreditRepository;
pub use ledger::PgLedgerRepository;
pub use roster::PgRosterRepository;
