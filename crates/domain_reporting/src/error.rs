//! Reporting domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur while building reports
#[derive(Debug, Error)]
pub enum ReportingError {
    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}
