//! Ledger generation
//!
//! Produces fee and bill records for a cohort of students for one billing
//! cycle. Each student is an independent unit of work: a failure for one
//! student is collected and returned, never raised, and never aborts the
//! rest of the batch. Idempotency comes from the skip-existing check, which
//! the store applies atomically with the insert.

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use core_kernel::{
    AcademicPeriod, Actor, CategoryId, ClassLevel, Money, PortError, StudentId, StudentRef,
};
use domain_audit::{AuditAction, AuditRecord, EntityKind};
use domain_catalog::{CatalogPort, FeeCategory};
use domain_discount::{DiscountBreakdown, DiscountEngine};

use crate::bill::{Bill, BillItem};
use crate::error::LedgerError;
use crate::fee::Fee;
use crate::ports::{BillBatch, FeeBatch, LedgerPort, RosterPort};

/// Parameters of one generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Billing cycle to generate for
    pub period: AcademicPeriod,
    /// Class levels to include; empty means all
    pub class_levels: Vec<ClassLevel>,
    /// Due date stamped on every generated charge
    pub due_date: NaiveDate,
    /// Notes copied onto generated bills
    pub notes: String,
    /// Skip students who already have records for the period
    pub skip_existing: bool,
}

/// A per-student failure, collected rather than raised
#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub student_id: StudentId,
    pub reason: String,
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationSummary {
    /// Records created
    pub created: usize,
    /// Students skipped by the idempotency check
    pub skipped: usize,
    /// Students with no applicable categories (not an error)
    pub without_categories: usize,
    /// Per-student failures
    pub failures: Vec<GenerationFailure>,
}

impl GenerationSummary {
    /// True when every student processed cleanly
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generates fee and bill records for a billing cycle
pub struct ChargeGenerator {
    roster: Arc<dyn RosterPort>,
    catalog: Arc<dyn CatalogPort>,
    ledger: Arc<dyn LedgerPort>,
    discounts: DiscountEngine,
}

impl ChargeGenerator {
    pub fn new(
        roster: Arc<dyn RosterPort>,
        catalog: Arc<dyn CatalogPort>,
        ledger: Arc<dyn LedgerPort>,
        discounts: DiscountEngine,
    ) -> Self {
        Self {
            roster,
            catalog,
            ledger,
            discounts,
        }
    }

    /// Generates one bill per student, composed of the applicable category
    /// charges plus an adjustment line when a discount applies
    pub async fn generate_bills_for_period(
        &self,
        request: &GenerationRequest,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<GenerationSummary, LedgerError> {
        let categories = self.catalog.active_mandatory_categories().await?;
        let students = self.roster.active_students(&request.class_levels).await?;

        info!(
            period = %request.period,
            students = students.len(),
            categories = categories.len(),
            skip_existing = request.skip_existing,
            "starting bill generation"
        );

        let mut summary = GenerationSummary::default();
        for student in students {
            let applicable = applicable_categories(&categories, student.class_level);
            if applicable.is_empty() {
                summary.without_categories += 1;
                continue;
            }

            match self
                .generate_bill_for_student(request, actor, today, student, &applicable)
                .await
            {
                Ok(true) => summary.created += 1,
                Ok(false) => summary.skipped += 1,
                Err(error) => {
                    warn!(student = %student.id, %error, "bill generation failed for student");
                    summary.failures.push(GenerationFailure {
                        student_id: student.id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            "bill generation finished"
        );
        Ok(summary)
    }

    /// Generates one fee per applicable category per student
    pub async fn generate_fees_for_period(
        &self,
        request: &GenerationRequest,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<GenerationSummary, LedgerError> {
        let categories = self.catalog.active_mandatory_categories().await?;
        let students = self.roster.active_students(&request.class_levels).await?;

        info!(
            period = %request.period,
            students = students.len(),
            skip_existing = request.skip_existing,
            "starting fee generation"
        );

        let mut summary = GenerationSummary::default();
        for student in students {
            let applicable = applicable_categories(&categories, student.class_level);
            if applicable.is_empty() {
                summary.without_categories += 1;
                continue;
            }

            match self
                .generate_fees_for_student(request, actor, student, &applicable)
                .await
            {
                Ok(created) if created > 0 => summary.created += created,
                Ok(_) => summary.skipped += 1,
                Err(error) => {
                    warn!(student = %student.id, %error, "fee generation failed for student");
                    summary.failures.push(GenerationFailure {
                        student_id: student.id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            failures = summary.failures.len(),
            "fee generation finished"
        );
        Ok(summary)
    }

    /// Generates a single ad-hoc fee outside the batch flow
    pub async fn generate_fee_for_student(
        &self,
        student: StudentRef,
        category_id: CategoryId,
        period: AcademicPeriod,
        due_date: NaiveDate,
        actor: &Actor,
    ) -> Result<Fee, LedgerError> {
        let category = self.catalog.category(category_id).await?;
        if !category.is_active {
            return Err(LedgerError::CategoryInactive(category_id));
        }
        if !category.applies_to(student.class_level) {
            return Err(LedgerError::CategoryNotApplicable {
                category: category_id,
                level: student.class_level,
            });
        }

        let fee = Fee::generate(
            student.id,
            category_id,
            period,
            category.default_amount,
            due_date,
            actor,
        );
        let audit = fee_audit_record(actor, &fee, &category);
        self.ledger.insert_fee(fee.clone(), audit).await?;

        info!(fee = %fee.id, student = %student.id, "ad-hoc fee recorded");
        Ok(fee)
    }

    async fn generate_bill_for_student(
        &self,
        request: &GenerationRequest,
        actor: &Actor,
        today: NaiveDate,
        student: StudentRef,
        applicable: &[&FeeCategory],
    ) -> Result<bool, LedgerError> {
        let subtotal: Money = applicable.iter().map(|c| c.default_amount).sum();
        let discount = self.discounts.compute(student.id, subtotal).await?;

        let bill_number = self.ledger.allocate_bill_number().await?;
        let mut bill = Bill::draft(
            bill_number,
            student.id,
            request.period,
            today,
            request.due_date,
            request.notes.clone(),
            actor,
        );
        for category in applicable {
            bill.push_item(BillItem::charge(
                category.id,
                format!("{} - {}", category.code.display_name(), request.period.term),
                category.default_amount,
            ));
        }
        push_discount_items(&mut bill, &discount);
        bill.issue();

        let audit = AuditRecord::new(
            actor,
            AuditAction::Create,
            EntityKind::Bill,
            *bill.id.as_uuid(),
            json!({
                "bill_number": bill.bill_number,
                "student_id": bill.student_id,
                "period": request.period.to_string(),
                "total_amount": bill.total_amount,
                "discount": discount.total,
                "items": bill.items.len(),
            }),
        );

        let outcome = self
            .ledger
            .insert_bill(
                BillBatch {
                    bill,
                    consume_credits: discount.consumed_credits.clone(),
                    audit,
                },
                request.skip_existing,
            )
            .await
            .map_err(|e| duplicate_on_conflict(e, student.id, request.period))?;

        Ok(!outcome.skipped_existing)
    }

    async fn generate_fees_for_student(
        &self,
        request: &GenerationRequest,
        actor: &Actor,
        student: StudentRef,
        applicable: &[&FeeCategory],
    ) -> Result<usize, LedgerError> {
        let subtotal: Money = applicable.iter().map(|c| c.default_amount).sum();
        let discount = self.discounts.compute(student.id, subtotal).await?;
        let amounts = discounted_amounts(applicable, discount.total);

        let mut fees = Vec::with_capacity(applicable.len());
        let mut audit = Vec::with_capacity(applicable.len());
        for (category, amount) in applicable.iter().zip(amounts) {
            let fee = Fee::generate(
                student.id,
                category.id,
                request.period,
                amount,
                request.due_date,
                actor,
            );
            audit.push(fee_audit_record(actor, &fee, category));
            fees.push(fee);
        }

        let outcome = self
            .ledger
            .insert_fees(
                FeeBatch {
                    student_id: student.id,
                    period: request.period,
                    fees,
                    consume_credits: discount.consumed_credits.clone(),
                    audit,
                },
                request.skip_existing,
            )
            .await
            .map_err(|e| duplicate_on_conflict(e, student.id, request.period))?;

        Ok(outcome.created)
    }
}

/// Categories that generate for a class level, in catalog order
fn applicable_categories(
    categories: &[FeeCategory],
    level: ClassLevel,
) -> Vec<&FeeCategory> {
    categories
        .iter()
        .filter(|c| c.generates_for(level))
        .collect()
}

/// Per-category amounts with the discount absorbed from the last category
/// backwards, so the discounted amounts still sum to subtotal - discount
fn discounted_amounts(categories: &[&FeeCategory], discount: Money) -> Vec<Money> {
    let mut amounts: Vec<Money> = categories.iter().map(|c| c.default_amount).collect();
    let mut remaining = discount;
    for amount in amounts.iter_mut().rev() {
        if !remaining.is_positive() {
            break;
        }
        let cut = (*amount).min(remaining);
        *amount = *amount - cut;
        remaining = remaining - cut;
    }
    amounts
}

/// Appends the discount adjustment lines to a draft bill
fn push_discount_items(bill: &mut Bill, discount: &DiscountBreakdown) {
    if discount.sibling.is_positive() {
        bill.push_item(BillItem::adjustment(
            "Sibling discount",
            -discount.sibling,
        ));
    }
    if discount.credit.is_positive() {
        bill.push_item(BillItem::adjustment(
            "Student credit applied",
            -discount.credit,
        ));
    }
}

fn fee_audit_record(actor: &Actor, fee: &Fee, category: &FeeCategory) -> AuditRecord {
    AuditRecord::new(
        actor,
        AuditAction::Create,
        EntityKind::Fee,
        *fee.id.as_uuid(),
        json!({
            "student_id": fee.student_id,
            "category": category.code.code(),
            "amount_payable": fee.amount_payable,
            "period": fee.period().to_string(),
            "due_date": fee.due_date,
        }),
    )
}

fn duplicate_on_conflict(
    error: PortError,
    student: StudentId,
    period: AcademicPeriod,
) -> LedgerError {
    if error.is_conflict() {
        LedgerError::DuplicateGeneration { student, period }
    } else {
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_catalog::{BillingFrequency, CategoryCode};
    use rust_decimal_macros::dec;

    fn category(amount: &str) -> FeeCategory {
        FeeCategory::new(
            CategoryCode::Tuition,
            Money::new(amount.parse().unwrap()),
            BillingFrequency::Termly,
        )
    }

    #[test]
    fn test_discounted_amounts_absorbs_from_the_last() {
        let a = category("5000.00");
        let b = category("300.00");
        let categories = vec![&a, &b];

        let amounts = discounted_amounts(&categories, Money::new(dec!(100.00)));
        assert_eq!(amounts[0], Money::new(dec!(5000.00)));
        assert_eq!(amounts[1], Money::new(dec!(200.00)));
    }

    #[test]
    fn test_discounted_amounts_cascades_backwards() {
        let a = category("5000.00");
        let b = category("300.00");
        let categories = vec![&a, &b];

        // Discount exceeds the last category; remainder comes off the first
        let amounts = discounted_amounts(&categories, Money::new(dec!(500.00)));
        assert_eq!(amounts[0], Money::new(dec!(4800.00)));
        assert_eq!(amounts[1], Money::zero());

        let total: Money = amounts.into_iter().sum();
        assert_eq!(total, Money::new(dec!(4800.00)));
    }

    #[test]
    fn test_zero_discount_leaves_defaults() {
        let a = category("5000.00");
        let categories = vec![&a];
        let amounts = discounted_amounts(&categories, Money::zero());
        assert_eq!(amounts, vec![Money::new(dec!(5000.00))]);
    }
}
