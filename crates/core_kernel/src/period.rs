//! Academic period types
//!
//! A billing cycle is identified by an academic year (the literal string
//! form `"YYYY/YYYY"`, second year consecutive) and a term number. Both are
//! validated at the boundary so the ledger never stores a malformed period.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to academic period parsing and validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Invalid academic year '{0}': expected \"YYYY/YYYY\"")]
    InvalidYearFormat(String),

    #[error("Invalid academic year '{0}': second year must be the first plus one")]
    YearsNotConsecutive(String),

    #[error("Invalid term {0}: terms run 1 to {max}", max = Term::MAX)]
    InvalidTerm(u8),
}

/// An academic year such as `2024/2025`
///
/// Stored as the starting calendar year; the ending year is always the
/// starting year plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    /// Creates an academic year starting in the given calendar year
    pub fn starting(start: i32) -> Self {
        Self { start }
    }

    /// Parses the literal `"YYYY/YYYY"` form, validating consecutiveness
    pub fn parse(s: &str) -> Result<Self, PeriodError> {
        let (first, second) = s
            .split_once('/')
            .ok_or_else(|| PeriodError::InvalidYearFormat(s.to_string()))?;
        if first.len() != 4 || second.len() != 4 {
            return Err(PeriodError::InvalidYearFormat(s.to_string()));
        }
        let first: i32 = first
            .parse()
            .map_err(|_| PeriodError::InvalidYearFormat(s.to_string()))?;
        let second: i32 = second
            .parse()
            .map_err(|_| PeriodError::InvalidYearFormat(s.to_string()))?;
        if second != first + 1 {
            return Err(PeriodError::YearsNotConsecutive(s.to_string()));
        }
        Ok(Self { start: first })
    }

    /// The starting calendar year
    pub fn start_year(&self) -> i32 {
        self.start
    }

    /// The ending calendar year
    pub fn end_year(&self) -> i32 {
        self.start + 1
    }

    /// The following academic year
    pub fn next(&self) -> Self {
        Self {
            start: self.start + 1,
        }
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.start + 1)
    }
}

impl FromStr for AcademicYear {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = PeriodError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AcademicYear> for String {
    fn from(year: AcademicYear) -> String {
        year.to_string()
    }
}

/// A school term within an academic year (Ghana three-term system)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Term(u8);

impl Term {
    /// Highest valid term number
    pub const MAX: u8 = 3;

    pub const FIRST: Term = Term(1);
    pub const SECOND: Term = Term(2);
    pub const THIRD: Term = Term(3);

    /// Creates a term, validating the 1..=3 range
    pub fn new(number: u8) -> Result<Self, PeriodError> {
        if (1..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(PeriodError::InvalidTerm(number))
        }
    }

    /// The term number (1-based)
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Human-readable term name
    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "First Term",
            2 => "Second Term",
            _ => "Third Term",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term {}", self.0)
    }
}

impl TryFrom<u8> for Term {
    type Error = PeriodError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<Term> for u8 {
    fn from(term: Term) -> u8 {
        term.0
    }
}

/// The (academic year, term) pair identifying a billing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcademicPeriod {
    pub year: AcademicYear,
    pub term: Term,
}

impl AcademicPeriod {
    pub fn new(year: AcademicYear, term: Term) -> Self {
        Self { year, term }
    }
}

impl fmt::Display for AcademicPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_year() {
        let year = AcademicYear::parse("2024/2025").unwrap();
        assert_eq!(year.start_year(), 2024);
        assert_eq!(year.end_year(), 2025);
        assert_eq!(year.to_string(), "2024/2025");
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        assert!(matches!(
            AcademicYear::parse("2024-2025"),
            Err(PeriodError::InvalidYearFormat(_))
        ));
        assert!(matches!(
            AcademicYear::parse("24/25"),
            Err(PeriodError::InvalidYearFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_consecutive_years() {
        assert!(matches!(
            AcademicYear::parse("2024/2026"),
            Err(PeriodError::YearsNotConsecutive(_))
        ));
    }

    #[test]
    fn test_term_range() {
        assert!(Term::new(1).is_ok());
        assert!(Term::new(3).is_ok());
        assert!(matches!(Term::new(0), Err(PeriodError::InvalidTerm(0))));
        assert!(matches!(Term::new(4), Err(PeriodError::InvalidTerm(4))));
    }

    #[test]
    fn test_period_display() {
        let period = AcademicPeriod::new(AcademicYear::starting(2024), Term::FIRST);
        assert_eq!(period.to_string(), "2024/2025 Term 1");
    }
}
