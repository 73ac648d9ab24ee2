//! Catalog repository
//!
//! Category creation and the active-flag toggle; no general update exists,
//! so categories referenced by generated charges stay frozen.

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{CategoryId, DomainPort, PortError};
use domain_catalog::{Applicability, CatalogPort, FeeCategory};

use crate::error::port_err;
use crate::rows::{category_from_row, frequency_code};

/// PostgreSQL-backed fee category catalog
#[derive(Debug, Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PgCatalogRepository {}

const SELECT_CATEGORY: &str = "SELECT category_id, code, description, default_amount, frequency, \
     is_mandatory, is_active, applies_to_all, class_levels, created_at, updated_at \
     FROM fee_categories";

fn applicability_columns(applicability: &Applicability) -> (bool, String) {
    match applicability {
        Applicability::AllLevels => (true, String::new()),
        Applicability::Levels(levels) => (
            false,
            levels
                .iter()
                .map(|l| l.code())
                .collect::<Vec<_>>()
                .join(","),
        ),
    }
}

#[async_trait]
impl CatalogPort for PgCatalogRepository {
    async fn category(&self, id: CategoryId) -> Result<FeeCategory, PortError> {
        let row = sqlx::query(&format!("{} WHERE category_id = $1", SELECT_CATEGORY))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(port_err)?
            .ok_or_else(|| PortError::not_found("FeeCategory", id))?;
        Ok(category_from_row(&row)?)
    }

    async fn active_categories(&self) -> Result<Vec<FeeCategory>, PortError> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_active ORDER BY created_at",
            SELECT_CATEGORY
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;
        rows.iter()
            .map(|r| category_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn active_mandatory_categories(&self) -> Result<Vec<FeeCategory>, PortError> {
        let rows = sqlx::query(&format!(
            "{} WHERE is_active AND is_mandatory ORDER BY created_at",
            SELECT_CATEGORY
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(port_err)?;
        rows.iter()
            .map(|r| category_from_row(r).map_err(Into::into))
            .collect()
    }

    async fn insert_category(&self, category: FeeCategory) -> Result<(), PortError> {
        let (applies_to_all, class_levels) = applicability_columns(&category.applicability);
        sqlx::query(
            "INSERT INTO fee_categories (category_id, code, description, default_amount, \
             frequency, is_mandatory, is_active, applies_to_all, class_levels, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(category.id.as_uuid())
        .bind(category.code.code())
        .bind(&category.description)
        .bind(category.default_amount.amount())
        .bind(frequency_code(category.frequency))
        .bind(category.is_mandatory)
        .bind(category.is_active)
        .bind(applies_to_all)
        .bind(class_levels)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(port_err)?;
        Ok(())
    }

    async fn set_category_active(&self, id: CategoryId, active: bool) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE fee_categories SET is_active = $2, updated_at = now() WHERE category_id = $1",
        )
        .bind(id.as_uuid())
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(port_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("FeeCategory", id));
        }
        Ok(())
    }
}
