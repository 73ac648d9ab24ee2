//! Discount & Installment Engine
//!
//! Computes the discounts applied at charge generation (flat sibling
//! discount via a pluggable policy, consumption of student credits) and
//! splits totals into exact-sum installment schedules.

pub mod credit;
pub mod discount;
pub mod error;
pub mod installment;

pub use credit::StudentCredit;
pub use discount::{
    CreditPort, DiscountBreakdown, DiscountEngine, NoSiblingData, SiblingPolicy,
};
pub use error::DiscountError;
pub use installment::{payment_plan, Installment, MAX_INSTALLMENTS, MIN_INSTALLMENTS};
