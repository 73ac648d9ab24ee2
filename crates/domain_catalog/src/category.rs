//! Fee category definitions
//!
//! A category is a charge template: a default amount, a billing frequency,
//! and an applicability rule over class levels. Once a category has been
//! referenced by a generated charge it is immutable apart from the active
//! flag, so frozen `amount_payable` values always trace back to the amount
//! that was in force at generation time.

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use core_kernel::{CategoryId, ClassLevel, Money};

/// Well-known category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryCode {
    Tuition,
    Admission,
    Transport,
    Technology,
    Examination,
    Uniform,
    Pta,
    ExtraClasses,
    Library,
    Sports,
    Medical,
    Development,
    Other,
}

impl CategoryCode {
    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            CategoryCode::Tuition => "TUITION",
            CategoryCode::Admission => "ADMISSION",
            CategoryCode::Transport => "TRANSPORT",
            CategoryCode::Technology => "TECHNOLOGY",
            CategoryCode::Examination => "EXAMINATION",
            CategoryCode::Uniform => "UNIFORM",
            CategoryCode::Pta => "PTA",
            CategoryCode::ExtraClasses => "EXTRA_CLASSES",
            CategoryCode::Library => "LIBRARY",
            CategoryCode::Sports => "SPORTS",
            CategoryCode::Medical => "MEDICAL",
            CategoryCode::Development => "DEVELOPMENT",
            CategoryCode::Other => "OTHER",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CategoryCode::Tuition => "Tuition Fees",
            CategoryCode::Admission => "Admission Fees",
            CategoryCode::Transport => "Transport Fees",
            CategoryCode::Technology => "Technology Fee",
            CategoryCode::Examination => "Examination Fees",
            CategoryCode::Uniform => "Uniform Fees",
            CategoryCode::Pta => "PTA Fees",
            CategoryCode::ExtraClasses => "Extra Classes Fees",
            CategoryCode::Library => "Library Fees",
            CategoryCode::Sports => "Sports Fees",
            CategoryCode::Medical => "Medical Fees",
            CategoryCode::Development => "Development Levy",
            CategoryCode::Other => "Other Fees",
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How often a category bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    OneTime,
    Termly,
    Monthly,
    Quarterly,
    Semester,
    Annual,
    Custom,
}

/// Which class levels a category charges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "levels")]
pub enum Applicability {
    /// Applies to every class level
    AllLevels,
    /// Applies only to the listed levels
    Levels(BTreeSet<ClassLevel>),
}

impl Applicability {
    /// Builds a level-restricted applicability rule
    pub fn levels(levels: impl IntoIterator<Item = ClassLevel>) -> Self {
        Applicability::Levels(levels.into_iter().collect())
    }

    /// Returns true if the rule covers `level`
    pub fn covers(&self, level: ClassLevel) -> bool {
        match self {
            Applicability::AllLevels => true,
            // An empty level set means no restriction was configured
            Applicability::Levels(levels) => levels.is_empty() || levels.contains(&level),
        }
    }
}

/// A fee category: a charge template for ledger generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCategory {
    /// Unique identifier
    pub id: CategoryId,
    /// Enum-like code
    pub code: CategoryCode,
    /// Free-text description
    pub description: String,
    /// Amount charged when a Fee/BillItem is generated from this category
    pub default_amount: Money,
    /// Billing frequency
    pub frequency: BillingFrequency,
    /// Mandatory categories are included in batch generation
    pub is_mandatory: bool,
    /// Inactive categories are never generated from
    pub is_active: bool,
    /// Which class levels this category charges
    pub applicability: Applicability,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp (active-flag toggles only once referenced)
    pub updated_at: DateTime<Utc>,
}

impl FeeCategory {
    /// Creates a new mandatory, active, all-levels category
    pub fn new(code: CategoryCode, default_amount: Money, frequency: BillingFrequency) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new_v7(),
            code,
            description: String::new(),
            default_amount,
            frequency,
            is_mandatory: true,
            is_active: true,
            applicability: Applicability::AllLevels,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the category optional (excluded from batch generation)
    pub fn optional(mut self) -> Self {
        self.is_mandatory = false;
        self
    }

    /// Restricts the category to specific class levels
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    /// Returns true if this category charges students at `level`
    pub fn applies_to(&self, level: ClassLevel) -> bool {
        self.applicability.covers(level)
    }

    /// Toggles the active flag, the one mutation allowed once referenced
    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }

    /// Returns true if batch generation should include this category for `level`
    pub fn generates_for(&self, level: ClassLevel) -> bool {
        self.is_active && self.is_mandatory && self.applies_to(level)
    }
}

/// The school's standard charge templates
///
/// Mirrors the amounts the accounts office seeds a fresh installation with.
pub fn standard_catalog() -> Vec<FeeCategory> {
    vec![
        FeeCategory::new(
            CategoryCode::Tuition,
            Money::new(dec!(5000.00)),
            BillingFrequency::Termly,
        )
        .with_description("Core academic instruction fees covering teacher salaries and classroom costs"),
        FeeCategory::new(
            CategoryCode::Admission,
            Money::new(dec!(500.00)),
            BillingFrequency::OneTime,
        )
        .with_description("One-time fee charged when a student is newly enrolled"),
        FeeCategory::new(
            CategoryCode::Transport,
            Money::new(dec!(800.00)),
            BillingFrequency::Termly,
        )
        .with_description("School bus transportation services")
        .optional(),
        FeeCategory::new(
            CategoryCode::Technology,
            Money::new(dec!(300.00)),
            BillingFrequency::Termly,
        )
        .with_description("Computer labs, software licenses, internet access and educational technology"),
        FeeCategory::new(
            CategoryCode::Examination,
            Money::new(dec!(200.00)),
            BillingFrequency::Termly,
        )
        .with_description("Internal and external examinations and certifications"),
        FeeCategory::new(
            CategoryCode::Uniform,
            Money::new(dec!(350.00)),
            BillingFrequency::OneTime,
        )
        .with_description("School uniform costs"),
        FeeCategory::new(
            CategoryCode::Pta,
            Money::new(dec!(100.00)),
            BillingFrequency::Termly,
        )
        .with_description("Parent-Teacher Association fees for school development projects"),
        FeeCategory::new(
            CategoryCode::ExtraClasses,
            Money::new(dec!(400.00)),
            BillingFrequency::Termly,
        )
        .with_description("Additional tuition and special classes outside regular hours")
        .optional(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_levels_applicability() {
        let category = FeeCategory::new(
            CategoryCode::Tuition,
            Money::from_major(5000),
            BillingFrequency::Termly,
        );
        assert!(category.applies_to(ClassLevel::Nursery));
        assert!(category.applies_to(ClassLevel::Shs3));
    }

    #[test]
    fn test_restricted_applicability() {
        let category = FeeCategory::new(
            CategoryCode::ExtraClasses,
            Money::from_major(400),
            BillingFrequency::Termly,
        )
        .with_applicability(Applicability::levels([ClassLevel::Jhs3, ClassLevel::Shs3]));

        assert!(category.applies_to(ClassLevel::Jhs3));
        assert!(!category.applies_to(ClassLevel::Primary1));
    }

    #[test]
    fn test_empty_level_set_means_unrestricted() {
        let applicability = Applicability::levels([]);
        assert!(applicability.covers(ClassLevel::Kg));
    }

    #[test]
    fn test_generates_for_requires_active_and_mandatory() {
        let mut category = FeeCategory::new(
            CategoryCode::Tuition,
            Money::from_major(5000),
            BillingFrequency::Termly,
        );
        assert!(category.generates_for(ClassLevel::Primary3));

        category.set_active(false);
        assert!(!category.generates_for(ClassLevel::Primary3));

        category.set_active(true);
        category.is_mandatory = false;
        assert!(!category.generates_for(ClassLevel::Primary3));
    }

    #[test]
    fn test_standard_catalog_shape() {
        let catalog = standard_catalog();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.iter().all(|c| c.is_active));

        let tuition = catalog
            .iter()
            .find(|c| c.code == CategoryCode::Tuition)
            .unwrap();
        assert!(tuition.is_mandatory);
        assert_eq!(tuition.default_amount, Money::from_major(5000));

        let optional: Vec<_> = catalog.iter().filter(|c| !c.is_mandatory).collect();
        assert_eq!(optional.len(), 2);
    }
}
