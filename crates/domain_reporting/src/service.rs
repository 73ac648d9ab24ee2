//! Read-only reporting service
//!
//! Pure derived views over the ledger; nothing here writes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use core_kernel::AcademicPeriod;
use domain_ledger::LedgerPort;

use crate::arrears::{arrears_report, ArrearsLine};
use crate::collection::{collection_summary, CollectionSummary};
use crate::error::ReportingError;

/// Aggregation queries over the ledger
pub struct ReportingService {
    ledger: Arc<dyn LedgerPort>,
}

impl ReportingService {
    pub fn new(ledger: Arc<dyn LedgerPort>) -> Self {
        Self { ledger }
    }

    /// totalPaid / totalBilled * 100 for a billing cycle
    pub async fn collection_rate(
        &self,
        period: AcademicPeriod,
    ) -> Result<Decimal, ReportingError> {
        Ok(self.collection_summary(period).await?.collection_rate)
    }

    /// Billed/collected/outstanding figures for a billing cycle
    pub async fn collection_summary(
        &self,
        period: AcademicPeriod,
    ) -> Result<CollectionSummary, ReportingError> {
        let charges = self.ledger.charges_for_period(&period).await?;
        let summary = collection_summary(period, &charges);
        debug!(
            %period,
            billed = %summary.total_billed,
            collected = %summary.total_collected,
            "collection summary computed"
        );
        Ok(summary)
    }

    /// Students with money outstanding, sorted descending by balance
    pub async fn arrears_report(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ArrearsLine>, ReportingError> {
        let outstanding = self.ledger.outstanding_charges().await?;
        Ok(arrears_report(&outstanding, today))
    }
}
