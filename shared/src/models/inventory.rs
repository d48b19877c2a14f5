//! Inventory ledger models
//!
//! An inventory record's `stock_qty` is justified by its append-only stock
//! transaction log: at any point it equals the sum of the signed quantities
//! of all committed transactions (adjustments contribute their stored delta).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of stock transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Receive,
    Issue,
    Adjustment,
    Transfer,
    StockOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receive => "receive",
            TransactionType::Issue => "issue",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Transfer => "transfer",
            TransactionType::StockOut => "stock_out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receive" => Some(TransactionType::Receive),
            "issue" => Some(TransactionType::Issue),
            "adjustment" => Some(TransactionType::Adjustment),
            "transfer" => Some(TransactionType::Transfer),
            "stock_out" => Some(TransactionType::StockOut),
            _ => None,
        }
    }

    /// Whether this type removes stock from the record it is logged against
    pub fn is_outgoing(&self) -> bool {
        matches!(self, TransactionType::Issue | TransactionType::StockOut)
    }
}

/// Signed ledger quantity for a transaction entry
///
/// `qty` is the positive operation amount. Transfers appear on both sides of
/// a movement: `outgoing = true` on the source row, `false` on the
/// destination row, so the signed total across both rows nets to zero.
/// Adjustment entries store the delta (new − current) computed by the caller
/// and must be passed through unchanged.
pub fn signed_entry(tx_type: TransactionType, qty: Decimal, outgoing: bool) -> Decimal {
    match tx_type {
        TransactionType::Receive => qty,
        TransactionType::Issue | TransactionType::StockOut => -qty,
        TransactionType::Transfer => {
            if outgoing {
                -qty
            } else {
                qty
            }
        }
        TransactionType::Adjustment => qty,
    }
}

/// A current-quantity row, uniquely keyed by (barcode, warehouse_name)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: Uuid,
    pub barcode: String,
    pub warehouse_name: String,
    pub item_name: String,
    pub category: Option<String>,
    /// May be negative; the ledger layer does not hard-block negative results
    pub stock_qty: Decimal,
    /// Low-stock threshold; zero disables the alert
    pub stock_alert_level: Decimal,
    /// Item-level single expiry for non-batched items
    pub expire_date: Option<NaiveDate>,
    /// Days-before-expiry threshold; zero disables the alert
    pub expire_date_alert: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only stock transaction; immutable once written.
/// Corrections are new adjustment entries, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub transaction_type: TransactionType,
    /// Signed per type: receive +, issue/stock_out −, transfer ±, adjustment delta
    pub quantity: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub reference_doc: Option<String>,
    pub reason: Option<String>,
    pub processed_by: Uuid,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_entry_directions() {
        let ten = Decimal::from(10);
        assert_eq!(signed_entry(TransactionType::Receive, ten, false), ten);
        assert_eq!(signed_entry(TransactionType::Issue, ten, true), -ten);
        assert_eq!(signed_entry(TransactionType::StockOut, ten, true), -ten);
        assert_eq!(signed_entry(TransactionType::Transfer, ten, true), -ten);
        assert_eq!(signed_entry(TransactionType::Transfer, ten, false), ten);
    }

    #[test]
    fn test_adjustment_keeps_delta() {
        let delta = Decimal::from(-7);
        assert_eq!(signed_entry(TransactionType::Adjustment, delta, false), delta);
    }

    #[test]
    fn test_transfer_nets_to_zero() {
        let qty = Decimal::from(25);
        let source = signed_entry(TransactionType::Transfer, qty, true);
        let dest = signed_entry(TransactionType::Transfer, qty, false);
        assert_eq!(source + dest, Decimal::ZERO);
    }
}
