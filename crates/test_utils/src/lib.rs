//! Shared test utilities for the fee ledger workspace
//!
//! Builders, fixtures, seeding helpers, and invariant assertions used by the
//! integration test suites. Not for production use.

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod seed;

pub use assertions::{assert_charge_invariant, assert_sums_to};
pub use builders::{BillBuilder, CategoryBuilder, FeeBuilder, StudentBuilder};
pub use fixtures::{catalog_fixture, DateFixtures, MoneyFixtures, PeriodFixtures};
pub use seed::{seeded_ledger, standard_ledger, SeededLedger};
