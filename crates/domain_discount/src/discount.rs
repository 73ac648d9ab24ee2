//! Discount computation
//!
//! Two discount sources apply at generation time: a flat sibling discount
//! (policy-pluggable) and unconsumed student credits. The combined discount
//! is capped at the subtotal so net payable never goes negative, and a
//! credit is only consumed when it actually contributes.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::debug;

use core_kernel::{CreditId, DomainPort, Money, PortError, Rate, StudentId};

use crate::credit::StudentCredit;
use crate::error::DiscountError;

/// Port for reading student credits
///
/// Consumption (marking used) is not exposed here: it happens inside the
/// ledger store transaction that inserts the generated charges, so a credit
/// can never be marked used without its discount landing.
#[async_trait]
pub trait CreditPort: DomainPort {
    /// Unconsumed credits for a student, oldest first
    async fn unused_credits(&self, student: StudentId) -> Result<Vec<StudentCredit>, PortError>;

    /// Records a new credit
    async fn insert_credit(&self, credit: StudentCredit) -> Result<(), PortError>;
}

/// Policy deciding whether a student has an enrolled sibling
#[async_trait]
pub trait SiblingPolicy: Send + Sync {
    async fn has_enrolled_sibling(&self, student: StudentId) -> Result<bool, PortError>;
}

/// Sibling policy that never grants the discount
///
/// Used where the deployment has no sibling data wired up.
pub struct NoSiblingData;

#[async_trait]
impl SiblingPolicy for NoSiblingData {
    async fn has_enrolled_sibling(&self, _student: StudentId) -> Result<bool, PortError> {
        Ok(false)
    }
}

/// The outcome of a discount computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountBreakdown {
    /// Sibling discount amount
    pub sibling: Money,
    /// Amount covered by consumed credits
    pub credit: Money,
    /// Credits to mark consumed, in application order
    pub consumed_credits: Vec<CreditId>,
    /// Total discount, capped at the subtotal
    pub total: Money,
}

impl DiscountBreakdown {
    /// A breakdown with no discount at all
    pub fn none() -> Self {
        Self {
            sibling: Money::zero(),
            credit: Money::zero(),
            consumed_credits: Vec::new(),
            total: Money::zero(),
        }
    }
}

/// Computes applicable discounts for a student's generation subtotal
pub struct DiscountEngine {
    sibling_policy: Arc<dyn SiblingPolicy>,
    credits: Arc<dyn CreditPort>,
    sibling_rate: Rate,
}

impl DiscountEngine {
    /// Creates an engine with the standard 10% sibling rate
    pub fn new(sibling_policy: Arc<dyn SiblingPolicy>, credits: Arc<dyn CreditPort>) -> Self {
        Self {
            sibling_policy,
            credits,
            sibling_rate: Rate::from_percentage(dec!(10)),
        }
    }

    /// Overrides the sibling discount rate
    pub fn with_sibling_rate(mut self, rate: Rate) -> Self {
        self.sibling_rate = rate;
        self
    }

    /// Computes the discount for `subtotal`
    ///
    /// Credits are applied oldest-first against the subtotal net of the
    /// sibling discount; each applied credit is consumed in full even when
    /// the applied amount is capped by what remains.
    pub async fn compute(
        &self,
        student: StudentId,
        subtotal: Money,
    ) -> Result<DiscountBreakdown, DiscountError> {
        if !subtotal.is_positive() {
            return Ok(DiscountBreakdown::none());
        }

        let sibling = if self.sibling_policy.has_enrolled_sibling(student).await? {
            self.sibling_rate.apply(&subtotal)
        } else {
            Money::zero()
        };

        let mut remaining = subtotal - sibling;
        let mut credit_applied = Money::zero();
        let mut consumed = Vec::new();

        for credit in self.credits.unused_credits(student).await? {
            if !remaining.is_positive() {
                break;
            }
            let applied = credit.amount.min(remaining);
            if !applied.is_positive() {
                continue;
            }
            remaining = remaining - applied;
            credit_applied = credit_applied + applied;
            consumed.push(credit.id);
        }

        let total = (sibling + credit_applied).min(subtotal);

        debug!(
            %student,
            subtotal = %subtotal,
            sibling = %sibling,
            credit = %credit_applied,
            "computed generation discount"
        );

        Ok(DiscountBreakdown {
            sibling,
            credit: credit_applied,
            consumed_credits: consumed,
            total,
        })
    }
}
