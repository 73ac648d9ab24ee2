//! Collection rate and efficiency queries

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{AcademicPeriod, Money};

use domain_ledger::Charge;

/// Collection figures for one billing cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub period: AcademicPeriod,
    /// Sum of payable amounts across live charges
    pub total_billed: Money,
    /// Sum of confirmed payments
    pub total_collected: Money,
    /// Billed minus collected (never negative; overpay counts as collected)
    pub outstanding: Money,
    /// collected / billed * 100, rounded to 2 dp for display
    pub collection_rate: Decimal,
}

/// Computes the collection summary over a period's charges
///
/// Cancelled and refunded bills are excluded from the billed base; a period
/// with nothing billed reports a zero rate.
pub fn collection_summary(period: AcademicPeriod, charges: &[Charge]) -> CollectionSummary {
    let mut total_billed = Money::zero();
    let mut total_collected = Money::zero();

    for charge in charges {
        if is_cancelled(charge) {
            continue;
        }
        total_billed = total_billed + charge.amount_payable();
        total_collected = total_collected + charge.amount_paid();
    }

    let outstanding = {
        let diff = total_billed - total_collected;
        if diff.is_negative() {
            Money::zero()
        } else {
            diff
        }
    };

    CollectionSummary {
        period,
        total_billed,
        total_collected,
        outstanding,
        collection_rate: rate_percent(total_collected, total_billed),
    }
}

/// collected / billed * 100 rounded to 2 dp; zero when nothing was billed
pub fn rate_percent(collected: Money, billed: Money) -> Decimal {
    if billed.is_zero() {
        return Decimal::ZERO;
    }
    (collected.amount() / billed.amount() * dec!(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn is_cancelled(charge: &Charge) -> bool {
    match charge {
        Charge::Fee(_) => false,
        Charge::Bill(bill) => bill.status.is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_percent_rounds_for_display() {
        let rate = rate_percent(Money::from_minor(1), Money::from_minor(3));
        assert_eq!(rate, dec!(33.33));
    }

    #[test]
    fn test_zero_billed_gives_zero_rate() {
        assert_eq!(rate_percent(Money::zero(), Money::zero()), Decimal::ZERO);
    }
}
