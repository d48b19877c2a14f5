//! Transfer consistency tests
//!
//! Tests for warehouse-to-warehouse transfers including:
//! - Conservation: the two transfer rows net to zero
//! - Lazy destination creation starting from a zero balance
//! - Source sufficiency checks

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{signed_entry, TransactionType};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test that a transfer moves quantity without creating or destroying it
    #[test]
    fn test_transfer_conservation() {
        let source_before = dec("50.0");
        let dest_before = dec("0.0");
        let qty = dec("5.0");

        let source_entry = signed_entry(TransactionType::Transfer, qty, true);
        let dest_entry = signed_entry(TransactionType::Transfer, qty, false);

        let source_after = source_before + source_entry;
        let dest_after = dest_before + dest_entry;

        assert_eq!(source_after, dec("45.0"));
        assert_eq!(dest_after, dec("5.0"));
        assert_eq!(source_before + dest_before, source_after + dest_after);
    }

    /// Test that the two transfer rows sum to zero
    #[test]
    fn test_transfer_rows_net_zero() {
        let qty = dec("17.25");
        let source = signed_entry(TransactionType::Transfer, qty, true);
        let dest = signed_entry(TransactionType::Transfer, qty, false);

        assert_eq!(source + dest, Decimal::ZERO);
    }

    /// A lazily created destination record starts from zero and ends at the
    /// transferred quantity
    #[test]
    fn test_lazy_destination_balance() {
        let qty = dec("5.0");
        let dest_start = Decimal::ZERO;
        let dest_after = dest_start + signed_entry(TransactionType::Transfer, qty, false);

        assert_eq!(dest_after, qty);
    }

    /// Source sufficiency: a transfer larger than the source balance is
    /// rejected before any row is written
    #[test]
    fn test_insufficient_source_rejected() {
        let source = dec("4.0");
        let qty = dec("5.0");

        assert!(source < qty);
    }

    /// Lock ordering: ids are always taken in ascending order so two
    /// opposite-direction transfers lock the same rows in the same order
    #[test]
    fn test_ascending_lock_order() {
        let a = uuid::Uuid::from_u128(1);
        let b = uuid::Uuid::from_u128(2);

        let forward = if a < b { (a, b) } else { (b, a) };
        let reverse = if b < a { (b, a) } else { (a, b) };

        assert_eq!(forward, reverse);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000u64).prop_map(|n| Decimal::new(n as i64, 2))
}

proptest! {
    /// Total stock across both warehouses is conserved by any transfer
    #[test]
    fn prop_transfer_conserves_total(
        source_start in quantity_strategy(),
        dest_start in quantity_strategy(),
        qty in quantity_strategy(),
    ) {
        prop_assume!(qty <= source_start);

        let source_after = source_start + signed_entry(TransactionType::Transfer, qty, true);
        let dest_after = dest_start + signed_entry(TransactionType::Transfer, qty, false);

        prop_assert_eq!(source_start + dest_start, source_after + dest_after);
        prop_assert!(source_after >= Decimal::ZERO);
    }

    /// A round-trip transfer restores both balances
    #[test]
    fn prop_round_trip_restores_balances(
        source_start in quantity_strategy(),
        qty in quantity_strategy(),
    ) {
        prop_assume!(qty <= source_start);

        let source_mid = source_start + signed_entry(TransactionType::Transfer, qty, true);
        let dest_mid = signed_entry(TransactionType::Transfer, qty, false);

        let source_final = source_mid + signed_entry(TransactionType::Transfer, qty, false);
        let dest_final = dest_mid + signed_entry(TransactionType::Transfer, qty, true);

        prop_assert_eq!(source_final, source_start);
        prop_assert_eq!(dest_final, Decimal::ZERO);
    }
}
