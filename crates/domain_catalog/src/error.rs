//! Catalog domain errors

use core_kernel::{CategoryId, ClassLevel, PortError};
use thiserror::Error;

/// Errors that can occur in the catalog domain
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Category not found
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Category is inactive and cannot be generated from
    #[error("Category {0} is inactive")]
    CategoryInactive(CategoryId),

    /// Category does not charge the given class level
    #[error("Category {category} does not apply to class level {level}")]
    NotApplicable {
        category: CategoryId,
        level: ClassLevel,
    },

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}
