//! Audit domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the audit domain
#[derive(Debug, Error)]
pub enum AuditError {
    /// The trail could not be written; the enclosing transaction must roll back
    #[error("Audit write failed: {0}")]
    WriteFailed(String),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}
