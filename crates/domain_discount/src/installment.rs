//! Installment payment plans
//!
//! A plan splits a total into equal installments due 30 days apart. The
//! last installment absorbs the rounding remainder so the plan sums to the
//! total exactly; percentages are rounded for display only.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;

use crate::error::DiscountError;

/// Minimum number of installments in a plan
pub const MIN_INSTALLMENTS: u8 = 1;

/// Maximum number of installments in a plan
pub const MAX_INSTALLMENTS: u8 = 6;

/// Days between consecutive installment due dates
const INSTALLMENT_SPACING_DAYS: u64 = 30;

/// One installment of a payment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the plan
    pub number: u8,
    /// Amount due
    pub amount: Money,
    /// Due date
    pub due_date: NaiveDate,
    /// Share of the total, rounded to 2 dp (display only)
    pub percentage: Decimal,
}

/// Generates an installment plan for `total`
///
/// Installments are equal to the cent except the last, which absorbs the
/// remainder (`total - sum(others)`). Due dates start 30 days after
/// `start` and repeat every 30 days.
///
/// # Errors
///
/// Returns `DiscountError::InvalidInstallmentCount` when `num_installments`
/// is outside 1..=6.
pub fn payment_plan(
    total: Money,
    num_installments: u8,
    start: NaiveDate,
) -> Result<Vec<Installment>, DiscountError> {
    if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&num_installments) {
        return Err(DiscountError::InvalidInstallmentCount(num_installments));
    }

    let each = total
        .divide(Decimal::from(num_installments))
        .map_err(|e| DiscountError::Calculation(e.to_string()))?;
    let all_but_last = each.multiply(Decimal::from(num_installments - 1));
    let last = total - all_but_last;

    let mut plan = Vec::with_capacity(num_installments as usize);
    for i in 0..num_installments {
        let number = i + 1;
        let amount = if number == num_installments { last } else { each };
        let due_date = start
            .checked_add_days(Days::new(INSTALLMENT_SPACING_DAYS * number as u64))
            .ok_or_else(|| DiscountError::Calculation("due date out of range".to_string()))?;

        plan.push(Installment {
            number,
            amount,
            due_date,
            percentage: amount.percent_of(total),
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn test_three_way_split_sums_exactly() {
        let plan = payment_plan(Money::new(dec!(10000.00)), 3, start()).unwrap();

        let amounts: Vec<_> = plan.iter().map(|i| i.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(3333.33), dec!(3333.33), dec!(3333.34)]);

        let total: Money = plan.iter().map(|i| i.amount).sum();
        assert_eq!(total, Money::new(dec!(10000.00)));
    }

    #[test]
    fn test_single_installment_is_the_total() {
        let plan = payment_plan(Money::new(dec!(750.25)), 1, start()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount, Money::new(dec!(750.25)));
        assert_eq!(plan[0].percentage, dec!(100.00));
    }

    #[test]
    fn test_due_dates_are_thirty_days_apart() {
        let plan = payment_plan(Money::new(dec!(600.00)), 3, start()).unwrap();
        assert_eq!(plan[0].due_date, start() + Days::new(30));
        assert_eq!(plan[1].due_date, start() + Days::new(60));
        assert_eq!(plan[2].due_date, start() + Days::new(90));
    }

    #[test]
    fn test_out_of_range_counts_rejected() {
        assert!(matches!(
            payment_plan(Money::new(dec!(100.00)), 0, start()),
            Err(DiscountError::InvalidInstallmentCount(0))
        ));
        assert!(matches!(
            payment_plan(Money::new(dec!(100.00)), 7, start()),
            Err(DiscountError::InvalidInstallmentCount(7))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // The one rounding rule that must be exact: installments always sum
        // to the total, for any amount and any valid plan length.
        #[test]
        fn installments_sum_to_total(
            minor in 1i64..1_000_000_000i64,
            count in 1u8..=6u8
        ) {
            let total = Money::from_minor(minor);
            let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
            let plan = payment_plan(total, count, start).unwrap();

            let sum: Money = plan.iter().map(|i| i.amount).sum();
            prop_assert_eq!(sum, total);
            prop_assert_eq!(plan.len(), count as usize);
        }
    }
}
