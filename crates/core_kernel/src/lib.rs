//! Core Kernel - Foundational types and utilities for the fee ledger
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money type with precise two-decimal fixed-point arithmetic
//! - Academic period types (year/term billing cycles)
//! - Typed actor identity for audit attribution
//! - Common identifiers and port infrastructure

pub mod actor;
pub mod error;
pub mod identifiers;
pub mod money;
pub mod period;
pub mod ports;
pub mod student;

pub use actor::{Actor, ActorRole, Origin};
pub use error::CoreError;
pub use identifiers::{
    ActorId, AuditEntryId, BillId, BillItemId, CategoryId, CreditId, FeeId, PaymentId, StudentId,
};
pub use money::{Money, MoneyError, Rate, CURRENCY_CODE, CURRENCY_SYMBOL, DECIMAL_PLACES};
pub use period::{AcademicPeriod, AcademicYear, PeriodError, Term};
pub use ports::{DomainPort, PortError};
pub use student::{ClassLevel, StudentRef};
