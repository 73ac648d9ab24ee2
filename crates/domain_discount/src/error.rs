//! Discount domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the discount and installment engine
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Installment count outside the supported 1..=6 range
    #[error("Invalid installment count {0}: plans run 1 to 6 installments")]
    InvalidInstallmentCount(u8),

    /// Calculation error
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}
