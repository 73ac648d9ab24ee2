//! Catalog port
//!
//! Category creation and the active-flag toggle are the only writes; there
//! is deliberately no general update so referenced categories stay frozen.

use async_trait::async_trait;

use core_kernel::{CategoryId, DomainPort, PortError};

use crate::category::FeeCategory;

/// Port for reading and administering the fee category catalog
#[async_trait]
pub trait CatalogPort: DomainPort {
    /// Looks up one category
    async fn category(&self, id: CategoryId) -> Result<FeeCategory, PortError>;

    /// All active categories
    async fn active_categories(&self) -> Result<Vec<FeeCategory>, PortError>;

    /// Active, mandatory categories - the batch generation set
    async fn active_mandatory_categories(&self) -> Result<Vec<FeeCategory>, PortError>;

    /// Inserts a new category
    async fn insert_category(&self, category: FeeCategory) -> Result<(), PortError>;

    /// Toggles the active flag
    async fn set_category_active(&self, id: CategoryId, active: bool) -> Result<(), PortError>;
}
