//! Common test fixtures
//!
//! Fixed amounts, periods, and dates used across the test suite so tests
//! agree on a shared vocabulary instead of re-deriving constants.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{AcademicPeriod, AcademicYear, Money, Term};
use domain_catalog::{standard_catalog, FeeCategory};

/// Monetary fixtures
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The standard tuition amount
    pub fn tuition() -> Money {
        Money::new(dec!(5000.00))
    }

    /// A typical partial payment
    pub fn partial_payment() -> Money {
        Money::new(dec!(3000.00))
    }

    /// A small charge that rounds awkwardly when split
    pub fn awkward_total() -> Money {
        Money::new(dec!(10000.00))
    }
}

/// Period fixtures
pub struct PeriodFixtures;

impl PeriodFixtures {
    /// The 2024/2025 academic year
    pub fn year() -> AcademicYear {
        AcademicYear::starting(2024)
    }

    /// First term of 2024/2025
    pub fn first_term() -> AcademicPeriod {
        AcademicPeriod::new(Self::year(), Term::FIRST)
    }

    /// Second term of 2024/2025
    pub fn second_term() -> AcademicPeriod {
        AcademicPeriod::new(Self::year(), Term::SECOND)
    }
}

/// Date fixtures
pub struct DateFixtures;

impl DateFixtures {
    /// A reference "today" early in the first term
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 10).expect("valid date")
    }

    /// A due date comfortably in the future relative to `today`
    pub fn future_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).expect("valid date")
    }

    /// A due date one day before `today`
    pub fn past_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 9).expect("valid date")
    }
}

/// The standard catalog, built once per test process
static STANDARD_CATALOG: Lazy<Vec<FeeCategory>> = Lazy::new(standard_catalog);

/// Returns a clone of the standard catalog fixture
pub fn catalog_fixture() -> Vec<FeeCategory> {
    STANDARD_CATALOG.clone()
}
