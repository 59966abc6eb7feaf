//! Property-based tests for beanval-core.
//!
//! Run with: cargo test -p beanval-core --test `property_tests`

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use beanval_core::{
    round_units, Amount, BookingMethod, Cost, CostSpec, Inventory, Position, RoundingDirection,
};

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_decimal() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_positive_decimal() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Prices in the range a valuation would produce: 0.0001 .. 1000.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2025i32, 1u32..13u32, 1u32..29u32)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_lot() -> impl Strategy<Value = Position> {
    (arb_positive_decimal(), arb_positive_decimal(), arb_date()).prop_map(|(n, c, d)| {
        Position::with_cost(
            Amount::new(n, "HOOL"),
            Cost::new(c, "USD").with_date(d),
        )
    })
}

fn arb_lots() -> impl Strategy<Value = Vec<Position>> {
    prop::collection::vec(arb_lot(), 1..8)
}

fn arb_method() -> impl Strategy<Value = BookingMethod> {
    prop_oneof![
        Just(BookingMethod::Fifo),
        Just(BookingMethod::Lifo),
        Just(BookingMethod::Hifo),
        Just(BookingMethod::Average),
    ]
}

// ============================================================================
// Rounding direction
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Inflows never understate units bought.
    #[test]
    fn prop_inflow_rounds_up(native in arb_positive_decimal(), price in arb_price()) {
        let exact = native / price;
        let rounded = round_units(exact, 7, RoundingDirection::for_flow(native));
        prop_assert!(rounded >= exact);
        prop_assert!(rounded - exact < Decimal::new(1, 7));
        prop_assert_eq!(rounded.scale(), 7);
    }

    /// Outflows never overstate units sold.
    #[test]
    fn prop_outflow_rounds_toward_zero(native in arb_positive_decimal(), price in arb_price()) {
        let exact = -native / price;
        let rounded = round_units(exact, 7, RoundingDirection::for_flow(-native));
        prop_assert!(rounded.abs() <= exact.abs());
        prop_assert!(exact.abs() - rounded.abs() < Decimal::new(1, 7));
        prop_assert!(rounded <= Decimal::ZERO);
    }

    /// Rounding a value already at scale is exact.
    #[test]
    fn prop_round_units_idempotent(n in arb_decimal()) {
        let once = round_units(n, 7, RoundingDirection::Up);
        prop_assert_eq!(round_units(once, 7, RoundingDirection::Down), once);
        prop_assert_eq!(once, n);
    }
}

// ============================================================================
// Inventory properties
// ============================================================================

proptest! {
    /// Adding a position changes units by exactly its number.
    #[test]
    fn prop_inventory_add_increases_units(lots in arb_lots(), extra in arb_lot()) {
        let mut inv = Inventory::new();
        for lot in lots {
            inv.add(lot);
        }
        let before = inv.units("HOOL");
        inv.add(extra.clone());
        prop_assert_eq!(inv.units("HOOL"), before + extra.units.number);
    }

    /// Reduction removes exactly the requested units, matched lots sum to
    /// the request, and nothing goes negative.
    #[test]
    fn prop_reduce_conserves_units(
        lots in arb_lots(),
        fraction in 1u32..=100u32,
        method in arb_method(),
    ) {
        let mut inv = Inventory::new();
        for lot in lots {
            inv.add(lot);
        }
        let total = inv.units("HOOL");
        let requested = (total * Decimal::from(fraction) / Decimal::from(100)).round_dp(2);
        prop_assume!(requested > Decimal::ZERO && requested <= total);

        let result = inv
            .reduce(&Amount::new(-requested, "HOOL"), &CostSpec::default(), method)
            .unwrap();

        let matched: Decimal = result.matched.iter().map(|p| p.units.number).sum();
        prop_assert_eq!(matched, requested);
        prop_assert_eq!(inv.units("HOOL"), total - requested);
        prop_assert!(inv.positions().iter().all(|p| p.units.number > Decimal::ZERO));
    }

    /// Over-reduction fails and leaves the inventory untouched.
    #[test]
    fn prop_reduce_insufficient_is_atomic(lots in arb_lots(), extra in arb_positive_decimal()) {
        let mut inv = Inventory::new();
        for lot in lots {
            inv.add(lot);
        }
        let snapshot = inv.clone();
        let requested = inv.units("HOOL") + extra;

        let result = inv.reduce(
            &Amount::new(-requested, "HOOL"),
            &CostSpec::default(),
            BookingMethod::Fifo,
        );
        prop_assert!(result.is_err());
        prop_assert_eq!(inv, snapshot);
    }
}
