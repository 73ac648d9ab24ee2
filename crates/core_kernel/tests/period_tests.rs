//! Integration tests for academic period types

use core_kernel::{AcademicPeriod, AcademicYear, PeriodError, Term};

#[test]
fn academic_year_literal_format_is_validated_at_the_boundary() {
    assert!(AcademicYear::parse("2024/2025").is_ok());
    assert!(AcademicYear::parse("2024/2024").is_err());
    assert!(AcademicYear::parse("2025/2024").is_err());
    assert!(AcademicYear::parse("2024 2025").is_err());
    assert!(AcademicYear::parse("").is_err());
}

#[test]
fn academic_year_next_is_consecutive() {
    let year = AcademicYear::parse("2024/2025").unwrap();
    assert_eq!(year.next().to_string(), "2025/2026");
}

#[test]
fn academic_year_serde_uses_literal_string() {
    let year = AcademicYear::starting(2024);
    let json = serde_json::to_string(&year).unwrap();
    assert_eq!(json, "\"2024/2025\"");

    let back: AcademicYear = serde_json::from_str(&json).unwrap();
    assert_eq!(back, year);

    let bad: Result<AcademicYear, _> = serde_json::from_str("\"2024/2027\"");
    assert!(bad.is_err());
}

#[test]
fn term_boundaries() {
    assert_eq!(Term::new(1).unwrap(), Term::FIRST);
    assert_eq!(Term::new(2).unwrap().name(), "Second Term");
    assert_eq!(Term::new(0), Err(PeriodError::InvalidTerm(0)));
    assert_eq!(Term::new(4), Err(PeriodError::InvalidTerm(4)));
}

#[test]
fn periods_order_by_year_then_term() {
    let y24 = AcademicYear::starting(2024);
    let y25 = AcademicYear::starting(2025);

    let a = AcademicPeriod::new(y24, Term::THIRD);
    let b = AcademicPeriod::new(y25, Term::FIRST);
    assert!(a < b);

    let c = AcademicPeriod::new(y24, Term::FIRST);
    let d = AcademicPeriod::new(y24, Term::SECOND);
    assert!(c < d);
}
