//! Integration tests for the Money type

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Money, MoneyError, Rate};

#[test]
fn money_is_quantized_to_two_places() {
    let m = Money::new(dec!(19.999));
    assert_eq!(m.amount(), dec!(20.00));
    assert_eq!(m.amount().scale(), 2);
}

#[test]
fn money_never_loses_cents_in_sums() {
    // 0.01 added ten thousand times is exactly 100.00
    let total: Money = std::iter::repeat(Money::from_minor(1)).take(10_000).sum();
    assert_eq!(total, Money::new(dec!(100.00)));
}

#[test]
fn subtraction_can_go_negative_for_overpayment() {
    let payable = Money::new(dec!(500.00));
    let paid = Money::new(dec!(650.00));
    let balance = payable - paid;

    assert!(balance.is_negative());
    assert_eq!(balance.amount(), dec!(-150.00));
    assert_eq!(balance.abs().amount(), dec!(150.00));
}

#[test]
fn multiply_applies_half_up_rounding() {
    // 10% of 33.33 is 3.333 -> 3.33
    let m = Money::new(dec!(33.33)).multiply(dec!(0.10));
    assert_eq!(m.amount(), dec!(3.33));

    // 10% of 33.35 is 3.335 -> 3.34
    let m = Money::new(dec!(33.35)).multiply(dec!(0.10));
    assert_eq!(m.amount(), dec!(3.34));
}

#[test]
fn divide_rejects_zero() {
    assert_eq!(
        Money::new(dec!(100.00)).divide(Decimal::ZERO),
        Err(MoneyError::DivisionByZero)
    );
}

#[test]
fn rate_round_trips_percentage() {
    let rate = Rate::from_percentage(dec!(10));
    assert_eq!(rate.as_decimal(), dec!(0.10));
    assert_eq!(rate.as_percentage(), dec!(10));
    assert_eq!(rate.apply(&Money::new(dec!(5000.00))), Money::new(dec!(500.00)));
}

#[test]
fn money_serializes_as_plain_decimal() {
    let m = Money::new(dec!(1234.56));
    let json = serde_json::to_string(&m).unwrap();
    assert_eq!(json, "\"1234.56\"");

    let back: Money = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
}

#[test]
fn money_deserialization_quantizes() {
    let m: Money = serde_json::from_str("\"10.005\"").unwrap();
    assert_eq!(m.amount(), dec!(10.01));
}
