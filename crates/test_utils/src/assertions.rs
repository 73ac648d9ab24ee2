//! Custom assertions for ledger invariants

use core_kernel::Money;
use domain_ledger::{Charge, Payment};

/// Asserts the at-rest charge invariant:
/// `balance == amount_payable - amount_paid` and
/// `amount_paid == sum(confirmed payments)`
pub fn assert_charge_invariant(charge: &Charge, confirmed_payments: &[Payment]) {
    let paid: Money = confirmed_payments
        .iter()
        .filter(|p| p.is_confirmed)
        .map(|p| p.amount)
        .sum();

    assert_eq!(
        charge.amount_paid(),
        paid,
        "amount_paid must equal the sum of confirmed payments for {}",
        charge.charge_ref()
    );
    assert_eq!(
        charge.balance(),
        charge.amount_payable() - charge.amount_paid(),
        "balance must equal amount_payable - amount_paid for {}",
        charge.charge_ref()
    );
}

/// Asserts that a money iterator sums to exactly the expected total
pub fn assert_sums_to(parts: impl IntoIterator<Item = Money>, expected: Money) {
    let total: Money = parts.into_iter().sum();
    assert_eq!(total, expected, "parts must sum exactly to the total");
}
