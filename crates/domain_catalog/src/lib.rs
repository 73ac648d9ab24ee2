//! Fee Category Catalog Domain
//!
//! Charge templates for ledger generation: each category carries a default
//! amount, a billing frequency, mandatory/optional flags, and an
//! applicability rule over class levels. Amounts on generated charges are
//! frozen copies, so the catalog can evolve without rewriting history.

pub mod category;
pub mod error;
pub mod ports;

pub use category::{
    standard_catalog, Applicability, BillingFrequency, CategoryCode, FeeCategory,
};
pub use error::CatalogError;
pub use ports::CatalogPort;
