//! Alert models and priority rules
//!
//! Live alert views are derived fresh from ledger state on every query. The
//! alert log is a separate, acknowledgeable event store written by mutation
//! paths; the evaluator never writes to it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(AlertPriority::High),
            "medium" => Some(AlertPriority::Medium),
            "low" => Some(AlertPriority::Low),
            _ => None,
        }
    }
}

/// Alert categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    NegativeStock,
    Expiring,
    BatchExpiring,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::NegativeStock => "negative_stock",
            AlertType::Expiring => "expiring",
            AlertType::BatchExpiring => "batch_expiring",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low_stock" => Some(AlertType::LowStock),
            "negative_stock" => Some(AlertType::NegativeStock),
            "expiring" => Some(AlertType::Expiring),
            "batch_expiring" => Some(AlertType::BatchExpiring),
            _ => None,
        }
    }
}

/// Persisted, acknowledgeable alert event for an inventory record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLog {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
    pub message_th: String,
    pub inventory_id: Uuid,
    pub acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Persisted, acknowledgeable alert event for a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAlert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
    pub message_th: String,
    pub batch_id: Uuid,
    pub acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A live-computed alert (never persisted)
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAlert {
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub barcode: String,
    pub warehouse_name: String,
    pub item_name: String,
    pub inventory_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub stock_qty: Option<Decimal>,
    pub stock_alert_level: Option<Decimal>,
    pub days_until_expiry: Option<i64>,
    pub message: String,
    pub message_th: String,
}

/// Canonical low-stock priority rule, used by both the live evaluator and the
/// mutation-path alert log writer.
///
/// Returns `None` when alerting is disabled (level ≤ 0) or stock is above the
/// threshold. High when stock is exhausted or at half the threshold or below,
/// medium for the rest of the band.
pub fn low_stock_priority(stock_qty: Decimal, alert_level: Decimal) -> Option<AlertPriority> {
    if alert_level <= Decimal::ZERO || stock_qty > alert_level {
        return None;
    }
    if stock_qty <= Decimal::ZERO || stock_qty * Decimal::TWO <= alert_level {
        Some(AlertPriority::High)
    } else {
        Some(AlertPriority::Medium)
    }
}

/// Mutation-path alert rule: a persisted alert event is only emitted when an
/// operation crosses the threshold from above, so repeated issues inside the
/// band do not spam the log.
pub fn low_stock_crossing(
    previous_qty: Decimal,
    new_qty: Decimal,
    alert_level: Decimal,
) -> Option<AlertPriority> {
    if previous_qty <= alert_level {
        return None;
    }
    low_stock_priority(new_qty, alert_level)
}

/// Receive-path alert rule. Receives move the balance upward, so the
/// from-above crossing rule can never fire for them; instead a receipt that
/// still leaves the balance inside the band (a first receipt below the
/// threshold, or a top-up too small to clear it) alerts directly, suppressed
/// while an unacknowledged alert for the record is already pending.
pub fn low_stock_after_receive(
    new_qty: Decimal,
    alert_level: Decimal,
    alert_pending: bool,
) -> Option<AlertPriority> {
    if alert_pending {
        return None;
    }
    low_stock_priority(new_qty, alert_level)
}

/// Priority for an item or batch already inside its expiry-alert window:
/// high when expired or within seven days, medium otherwise.
pub fn expiring_stock_priority(days_until_expiry: i64) -> AlertPriority {
    if days_until_expiry <= 7 {
        AlertPriority::High
    } else {
        AlertPriority::Medium
    }
}

/// Priority tiering applied when a batch is created: high within seven days
/// (or already expired), medium within fourteen, low within `window_days`.
/// `None` when the expiry is beyond the window.
pub fn batch_expiry_priority(days_until_expiry: i64, window_days: i64) -> Option<AlertPriority> {
    if days_until_expiry > window_days {
        return None;
    }
    if days_until_expiry <= 7 {
        Some(AlertPriority::High)
    } else if days_until_expiry <= 14 {
        Some(AlertPriority::Medium)
    } else {
        Some(AlertPriority::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_low_stock_disabled() {
        assert_eq!(low_stock_priority(dec(5), Decimal::ZERO), None);
    }

    #[test]
    fn test_low_stock_above_threshold() {
        assert_eq!(low_stock_priority(dec(11), dec(10)), None);
    }

    #[test]
    fn test_low_stock_half_band() {
        assert_eq!(low_stock_priority(dec(5), dec(10)), Some(AlertPriority::High));
        assert_eq!(low_stock_priority(dec(6), dec(10)), Some(AlertPriority::Medium));
        assert_eq!(low_stock_priority(dec(10), dec(10)), Some(AlertPriority::Medium));
    }

    #[test]
    fn test_low_stock_exhausted_is_high() {
        assert_eq!(low_stock_priority(Decimal::ZERO, dec(10)), Some(AlertPriority::High));
        assert_eq!(low_stock_priority(dec(-3), dec(10)), Some(AlertPriority::High));
    }

    #[test]
    fn test_crossing_only_from_above() {
        // 12 -> 5 crosses the threshold of 10
        assert_eq!(low_stock_crossing(dec(12), dec(5), dec(10)), Some(AlertPriority::High));
        // 8 -> 5 was already inside the band
        assert_eq!(low_stock_crossing(dec(8), dec(5), dec(10)), None);
        // disabled threshold never fires
        assert_eq!(low_stock_crossing(dec(12), dec(5), Decimal::ZERO), None);
    }

    #[test]
    fn test_receive_landing_inside_band_alerts() {
        // A first receipt that lands below the threshold must alert even
        // though the balance only moved upward.
        assert_eq!(
            low_stock_after_receive(dec(5), dec(10), false),
            Some(AlertPriority::High)
        );
        assert_eq!(
            low_stock_after_receive(dec(8), dec(10), false),
            Some(AlertPriority::Medium)
        );
        // The upward direction means the crossing rule alone stays silent
        // for every receive-shaped transition.
        assert_eq!(low_stock_crossing(dec(0), dec(5), dec(10)), None);
    }

    #[test]
    fn test_receive_alert_suppressed_while_pending() {
        assert_eq!(low_stock_after_receive(dec(5), dec(10), true), None);
    }

    #[test]
    fn test_receive_clearing_threshold_is_silent() {
        assert_eq!(low_stock_after_receive(dec(11), dec(10), false), None);
        assert_eq!(low_stock_after_receive(dec(11), Decimal::ZERO, false), None);
    }

    #[test]
    fn test_batch_expiry_tiers() {
        assert_eq!(batch_expiry_priority(-1, 30), Some(AlertPriority::High));
        assert_eq!(batch_expiry_priority(7, 30), Some(AlertPriority::High));
        assert_eq!(batch_expiry_priority(14, 30), Some(AlertPriority::Medium));
        assert_eq!(batch_expiry_priority(30, 30), Some(AlertPriority::Low));
        assert_eq!(batch_expiry_priority(31, 30), None);
    }
}
