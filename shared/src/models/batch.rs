//! Batch (lot) tracking models
//!
//! A batch is an expiry-dated sub-allocation of an inventory record within one
//! warehouse. Its `quantity_remaining` is an independent ledger from the
//! parent record's `stock_qty`: the two can diverge when batch tracking is
//! only used for some receipts on an item, and no cross-invariant is enforced.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::inventory::TransactionType;

/// A batch of stock with a required expiry date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    /// Globally unique
    pub batch_number: String,
    pub inventory_id: Uuid,
    pub warehouse_id: Uuid,
    /// Fixed at creation
    pub quantity_received: Decimal,
    /// Always within [0, quantity_received]
    pub quantity_remaining: Decimal,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub supplier_info: Option<String>,
    pub lot_number: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    /// Soft-delete flag; deactivation is terminal
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only batch transaction, scoped to one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransaction {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub transaction_type: TransactionType,
    /// Signed like stock transactions; adjustment stores the delta
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub reference_doc: Option<String>,
    pub processed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Why a batch quantity change was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchQuantityError {
    /// Outgoing quantity exceeds quantity_remaining
    Insufficient,
    /// Result would fall outside [0, quantity_received]
    OutOfRange,
    /// Operation quantity is not positive
    NonPositive,
}

/// Compute the next `quantity_remaining` for a batch operation.
///
/// For `Adjustment`, `qty` is the absolute target value; for every other type
/// it is the positive operation amount. Enforces the hard invariant
/// 0 ≤ remaining ≤ received.
pub fn next_batch_remaining(
    remaining: Decimal,
    received: Decimal,
    tx_type: TransactionType,
    qty: Decimal,
) -> Result<Decimal, BatchQuantityError> {
    let next = match tx_type {
        TransactionType::Adjustment => qty,
        TransactionType::Receive => {
            if qty <= Decimal::ZERO {
                return Err(BatchQuantityError::NonPositive);
            }
            remaining + qty
        }
        TransactionType::Issue | TransactionType::Transfer | TransactionType::StockOut => {
            if qty <= Decimal::ZERO {
                return Err(BatchQuantityError::NonPositive);
            }
            if qty > remaining {
                return Err(BatchQuantityError::Insufficient);
            }
            remaining - qty
        }
    };

    if next < Decimal::ZERO || next > received {
        return Err(BatchQuantityError::OutOfRange);
    }
    Ok(next)
}

/// Derive the batch number for a transfer-created destination batch
pub fn derive_transfer_batch_number(source: &str, at: DateTime<Utc>) -> String {
    format!("{}-T{}", source, at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_outgoing_within_remaining() {
        let next = next_batch_remaining(dec(70), dec(100), TransactionType::Issue, dec(30));
        assert_eq!(next, Ok(dec(40)));
    }

    #[test]
    fn test_outgoing_exceeds_remaining() {
        let next = next_batch_remaining(dec(70), dec(100), TransactionType::Issue, dec(80));
        assert_eq!(next, Err(BatchQuantityError::Insufficient));
    }

    #[test]
    fn test_receive_cannot_exceed_received() {
        let next = next_batch_remaining(dec(90), dec(100), TransactionType::Receive, dec(20));
        assert_eq!(next, Err(BatchQuantityError::OutOfRange));
    }

    #[test]
    fn test_adjustment_sets_absolute_value() {
        let next = next_batch_remaining(dec(70), dec(100), TransactionType::Adjustment, dec(55));
        assert_eq!(next, Ok(dec(55)));
    }

    #[test]
    fn test_adjustment_out_of_range() {
        let over = next_batch_remaining(dec(70), dec(100), TransactionType::Adjustment, dec(120));
        assert_eq!(over, Err(BatchQuantityError::OutOfRange));
        let under = next_batch_remaining(dec(70), dec(100), TransactionType::Adjustment, dec(-1));
        assert_eq!(under, Err(BatchQuantityError::OutOfRange));
    }

    #[test]
    fn test_derived_batch_number() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let derived = derive_transfer_batch_number("B100", at);
        assert_eq!(derived, format!("B100-T{}", at.timestamp()));
        assert!(derived.starts_with("B100-T"));
    }
}
