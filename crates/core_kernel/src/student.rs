//! Roster value objects
//!
//! The roster itself lives in an external service; the ledger only sees
//! lightweight references carrying the class level used for category
//! applicability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifiers::StudentId;

/// Class levels (Ghana basic/secondary school system)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLevel {
    #[serde(rename = "NURSERY")]
    Nursery,
    #[serde(rename = "KG")]
    Kg,
    #[serde(rename = "PRIMARY_1")]
    Primary1,
    #[serde(rename = "PRIMARY_2")]
    Primary2,
    #[serde(rename = "PRIMARY_3")]
    Primary3,
    #[serde(rename = "PRIMARY_4")]
    Primary4,
    #[serde(rename = "PRIMARY_5")]
    Primary5,
    #[serde(rename = "PRIMARY_6")]
    Primary6,
    #[serde(rename = "JHS_1")]
    Jhs1,
    #[serde(rename = "JHS_2")]
    Jhs2,
    #[serde(rename = "JHS_3")]
    Jhs3,
    #[serde(rename = "SHS_1")]
    Shs1,
    #[serde(rename = "SHS_2")]
    Shs2,
    #[serde(rename = "SHS_3")]
    Shs3,
}

impl ClassLevel {
    /// All class levels in ascending order
    pub const ALL: [ClassLevel; 14] = [
        ClassLevel::Nursery,
        ClassLevel::Kg,
        ClassLevel::Primary1,
        ClassLevel::Primary2,
        ClassLevel::Primary3,
        ClassLevel::Primary4,
        ClassLevel::Primary5,
        ClassLevel::Primary6,
        ClassLevel::Jhs1,
        ClassLevel::Jhs2,
        ClassLevel::Jhs3,
        ClassLevel::Shs1,
        ClassLevel::Shs2,
        ClassLevel::Shs3,
    ];

    /// Stable storage code
    pub fn code(&self) -> &'static str {
        match self {
            ClassLevel::Nursery => "NURSERY",
            ClassLevel::Kg => "KG",
            ClassLevel::Primary1 => "PRIMARY_1",
            ClassLevel::Primary2 => "PRIMARY_2",
            ClassLevel::Primary3 => "PRIMARY_3",
            ClassLevel::Primary4 => "PRIMARY_4",
            ClassLevel::Primary5 => "PRIMARY_5",
            ClassLevel::Primary6 => "PRIMARY_6",
            ClassLevel::Jhs1 => "JHS_1",
            ClassLevel::Jhs2 => "JHS_2",
            ClassLevel::Jhs3 => "JHS_3",
            ClassLevel::Shs1 => "SHS_1",
            ClassLevel::Shs2 => "SHS_2",
            ClassLevel::Shs3 => "SHS_3",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ClassLevel::Nursery => "Nursery",
            ClassLevel::Kg => "Kindergarten",
            ClassLevel::Primary1 => "Primary 1",
            ClassLevel::Primary2 => "Primary 2",
            ClassLevel::Primary3 => "Primary 3",
            ClassLevel::Primary4 => "Primary 4",
            ClassLevel::Primary5 => "Primary 5",
            ClassLevel::Primary6 => "Primary 6",
            ClassLevel::Jhs1 => "JHS 1",
            ClassLevel::Jhs2 => "JHS 2",
            ClassLevel::Jhs3 => "JHS 3",
            ClassLevel::Shs1 => "SHS 1",
            ClassLevel::Shs2 => "SHS 2",
            ClassLevel::Shs3 => "SHS 3",
        }
    }
}

impl fmt::Display for ClassLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Error returned when parsing an unknown class level code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown class level: {0}")]
pub struct UnknownClassLevel(pub String);

impl FromStr for ClassLevel {
    type Err = UnknownClassLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|level| level.code().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownClassLevel(s.to_string()))
    }
}

/// A reference to an enrolled student, as supplied by the roster service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: StudentId,
    pub class_level: ClassLevel,
}

impl StudentRef {
    pub fn new(id: StudentId, class_level: ClassLevel) -> Self {
        Self { id, class_level }
    }
}
