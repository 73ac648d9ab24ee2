//! Ledger domain errors

use thiserror::Error;

use core_kernel::{AcademicPeriod, CategoryId, ClassLevel, PaymentId, PortError, StudentId};
use domain_discount::DiscountError;

use crate::charge::ChargeRef;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Payment amount was zero or negative
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The target charge is in a state that rejects payments
    #[error("Charge {target} is not accepting payments (status: {status})")]
    TargetNotAcceptingPayment { target: ChargeRef, status: String },

    /// Generation collided with existing records and skip-existing was off
    #[error("Charges already exist for student {student} in {period}")]
    DuplicateGeneration {
        student: StudentId,
        period: AcademicPeriod,
    },

    /// The category does not charge the student's class level
    #[error("Category {category} does not apply to class level {level}")]
    CategoryNotApplicable {
        category: CategoryId,
        level: ClassLevel,
    },

    /// The category is inactive and cannot be generated from
    #[error("Category {0} is inactive")]
    CategoryInactive(CategoryId),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The audit entry could not be written; the unit of work was rolled back
    #[error("Audit write failed: {0}")]
    AuditWriteFailed(String),

    /// Discount computation failed
    #[error("Discount error: {0}")]
    Discount(#[from] DiscountError),

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(PortError),
}

impl From<PortError> for LedgerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::AuditWriteFailed { message } => LedgerError::AuditWriteFailed(message),
            other => LedgerError::Store(other),
        }
    }
}
