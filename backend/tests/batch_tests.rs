//! Batch tracking tests
//!
//! Tests for batch quantity invariants including:
//! - Remaining quantity bounded by [0, received]
//! - Expiry alert tiering at creation
//! - Derived batch numbers for transfers

use chrono::{Days, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    batch_expiry_priority, derive_transfer_batch_number, next_batch_remaining, AlertPriority,
    BatchQuantityError, TransactionType,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A batch received at 100 and issued 30 holds 70
    #[test]
    fn test_issue_reduces_remaining() {
        let next = next_batch_remaining(dec("100"), dec("100"), TransactionType::Issue, dec("30"));
        assert_eq!(next, Ok(dec("70")));
    }

    /// Issuing more than the remaining quantity is rejected and the batch is
    /// unchanged
    #[test]
    fn test_over_issue_rejected() {
        let remaining = dec("70");
        let next = next_batch_remaining(remaining, dec("100"), TransactionType::Issue, dec("80"));
        assert_eq!(next, Err(BatchQuantityError::Insufficient));
        // Caller keeps the old value on error
        assert_eq!(remaining, dec("70"));
    }

    /// Receiving back into a batch cannot exceed the original received amount
    #[test]
    fn test_receive_bounded_by_received() {
        let next = next_batch_remaining(dec("95"), dec("100"), TransactionType::Receive, dec("10"));
        assert_eq!(next, Err(BatchQuantityError::OutOfRange));
    }

    /// Zero and negative operation quantities are rejected
    #[test]
    fn test_non_positive_rejected() {
        let zero = next_batch_remaining(dec("50"), dec("100"), TransactionType::Issue, dec("0"));
        assert_eq!(zero, Err(BatchQuantityError::NonPositive));

        let neg = next_batch_remaining(dec("50"), dec("100"), TransactionType::Receive, dec("-5"));
        assert_eq!(neg, Err(BatchQuantityError::NonPositive));
    }

    /// A batch expiring in five days gets a high priority alert at creation
    #[test]
    fn test_near_expiry_batch_is_high_priority() {
        assert_eq!(batch_expiry_priority(5, 30), Some(AlertPriority::High));
    }

    /// Expiry alert tiers at creation: high within 7 days, medium within 14,
    /// low within the window, none beyond it
    #[test]
    fn test_expiry_alert_tiers() {
        assert_eq!(batch_expiry_priority(-3, 30), Some(AlertPriority::High));
        assert_eq!(batch_expiry_priority(10, 30), Some(AlertPriority::Medium));
        assert_eq!(batch_expiry_priority(25, 30), Some(AlertPriority::Low));
        assert_eq!(batch_expiry_priority(45, 30), None);
    }

    /// Transfer-created batches derive their number from the source
    #[test]
    fn test_transfer_batch_number_derivation() {
        let at = Utc.with_ymd_and_hms(2026, 8, 25, 9, 30, 0).unwrap();
        let derived = derive_transfer_batch_number("B100", at);

        assert!(derived.starts_with("B100-T"));
        assert_ne!(derived, "B100");

        // Distinct timestamps give distinct derived numbers
        let later = at.checked_add_days(Days::new(1)).unwrap();
        assert_ne!(derived, derive_transfer_batch_number("B100", later));
    }

    /// A transfer deducts from the source batch like an issue
    #[test]
    fn test_transfer_deducts_from_source() {
        let next =
            next_batch_remaining(dec("100"), dec("100"), TransactionType::Transfer, dec("40"));
        assert_eq!(next, Ok(dec("60")));
    }

    /// Expiry is strictly before the reference date: a batch expiring today
    /// is still active today and swept tomorrow
    #[test]
    fn test_expired_is_strictly_before_reference_date() {
        let expiry = chrono::NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();

        let same_day = chrono::NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let next_day = chrono::NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();

        assert!(!(expiry < same_day));
        assert!(expiry < next_day);
    }

    /// The chunked expired-batch sweep stops at the first failed chunk but
    /// keeps the count of batches already deactivated by earlier chunks
    #[test]
    fn test_sweep_reports_progress_on_abort() {
        let chunk_size = 100u64;
        let chunks: Vec<Result<u64, String>> =
            vec![Ok(100), Ok(100), Err("connection reset".to_string())];

        let mut deactivated = 0u64;
        let mut aborted = None;
        for outcome in chunks {
            match outcome {
                Ok(n) => {
                    deactivated += n;
                    if n < chunk_size {
                        break;
                    }
                }
                Err(e) => {
                    aborted = Some(e);
                    break;
                }
            }
        }

        assert_eq!(deactivated, 200);
        assert_eq!(aborted.as_deref(), Some("connection reset"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000u64).prop_map(|n| Decimal::new(n as i64, 2))
}

proptest! {
    /// Every accepted operation keeps remaining within [0, received]
    #[test]
    fn prop_remaining_stays_in_bounds(
        received in quantity_strategy(),
        ops in prop::collection::vec((0u8..4, quantity_strategy()), 1..30),
    ) {
        let mut remaining = received;

        for (kind, qty) in ops {
            let tx_type = match kind {
                0 => TransactionType::Receive,
                1 => TransactionType::Issue,
                2 => TransactionType::StockOut,
                _ => TransactionType::Adjustment,
            };
            if let Ok(next) = next_batch_remaining(remaining, received, tx_type, qty) {
                remaining = next;
            }
            prop_assert!(remaining >= Decimal::ZERO);
            prop_assert!(remaining <= received);
        }
    }

    /// An issue followed by an equal receive restores the remaining quantity
    #[test]
    fn prop_issue_then_receive_restores(
        received in quantity_strategy(),
        qty in quantity_strategy(),
    ) {
        prop_assume!(qty <= received);

        let after_issue = next_batch_remaining(received, received, TransactionType::Issue, qty);
        prop_assert!(after_issue.is_ok());

        let restored =
            next_batch_remaining(after_issue.unwrap(), received, TransactionType::Receive, qty);
        prop_assert_eq!(restored, Ok(received));
    }
}
