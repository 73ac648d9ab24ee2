//! Reporting/Aggregation Domain
//!
//! Read-only derived views over the fee ledger: collection rate and
//! efficiency per billing cycle, and the arrears report with days-overdue
//! per student. These queries never write.

pub mod arrears;
pub mod collection;
pub mod error;
pub mod service;

pub use arrears::{arrears_report, ArrearsLine};
pub use collection::{collection_summary, rate_percent, CollectionSummary};
pub use error::ReportingError;
pub use service::ReportingService;
