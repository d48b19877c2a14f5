//! Bulk import (reconciliation) models
//!
//! The reconciliation engine consumes rows already parsed from an external
//! tabular source as `{column name → raw value}` maps. Header names are
//! matched case-insensitively; a typed row is produced by an explicit
//! schema-validation step before any ledger call is made.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// Rows start at spreadsheet line 2: line 1 is the header.
pub const IMPORT_HEADER_OFFSET: usize = 1;

/// Which ledger operation each imported row maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    FullUpsert,
    StockReceive,
    StockIssue,
    Adjustment,
    StockOut,
    StockAlertUpdate,
    StockTransfer,
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::FullUpsert => "full_upsert",
            ImportType::StockReceive => "stock_receive",
            ImportType::StockIssue => "stock_issue",
            ImportType::Adjustment => "adjustment",
            ImportType::StockOut => "stock_out",
            ImportType::StockAlertUpdate => "stock_alert_update",
            ImportType::StockTransfer => "stock_transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full_upsert" => Some(ImportType::FullUpsert),
            "stock_receive" => Some(ImportType::StockReceive),
            "stock_issue" => Some(ImportType::StockIssue),
            "adjustment" => Some(ImportType::Adjustment),
            "stock_out" => Some(ImportType::StockOut),
            "stock_alert_update" => Some(ImportType::StockAlertUpdate),
            "stock_transfer" => Some(ImportType::StockTransfer),
            _ => None,
        }
    }

    /// Required columns, matched against lowercased headers
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            ImportType::FullUpsert => &["barcode", "warehouse", "item_name", "quantity"],
            ImportType::StockReceive => &["barcode", "warehouse", "quantity"],
            ImportType::StockIssue => &["barcode", "warehouse", "quantity"],
            ImportType::Adjustment => &["barcode", "warehouse", "new_quantity"],
            ImportType::StockOut => &["barcode", "warehouse", "quantity"],
            ImportType::StockAlertUpdate => &["barcode", "warehouse", "stock_alert_level"],
            ImportType::StockTransfer => &["barcode", "from_warehouse", "to_warehouse", "quantity"],
        }
    }
}

/// Import job status
///
/// `Failed` means "not 100% clean": a job with any failed row is marked failed
/// even when most rows committed. Callers must inspect the failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ImportStatus::Pending),
            "completed" => Some(ImportStatus::Completed),
            "failed" => Some(ImportStatus::Failed),
            _ => None,
        }
    }
}

/// One bulk reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub import_type: ImportType,
    pub filename: String,
    pub total_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub status: ImportStatus,
    pub processed_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A per-row failure, tagged with its spreadsheet row number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    /// 1-based row index plus the header offset
    pub row_number: usize,
    pub message: String,
}

/// A raw imported row: lowercased header → trimmed raw value
pub type ImportRow = HashMap<String, String>;

/// Lowercase and trim header names and values of a raw row
pub fn normalize_row(raw: &HashMap<String, String>) -> ImportRow {
    raw.iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect()
}

/// Columns missing from a normalized header set, in declaration order
pub fn missing_columns(import_type: ImportType, headers: &ImportRow) -> Vec<&'static str> {
    import_type
        .required_columns()
        .iter()
        .filter(|c| !headers.contains_key(**c))
        .copied()
        .collect()
}

/// A schema-validated import row, ready for a ledger call
#[derive(Debug, Clone, PartialEq)]
pub enum TypedImportRow {
    FullUpsert {
        barcode: String,
        warehouse: String,
        item_name: String,
        quantity: Decimal,
        category: Option<String>,
        stock_alert_level: Option<Decimal>,
        expire_date: Option<NaiveDate>,
        expire_date_alert: Option<i32>,
    },
    StockReceive {
        barcode: String,
        warehouse: String,
        quantity: Decimal,
        reference_doc: Option<String>,
        reason: Option<String>,
    },
    StockIssue {
        barcode: String,
        warehouse: String,
        quantity: Decimal,
        reference_doc: Option<String>,
        reason: Option<String>,
    },
    Adjustment {
        barcode: String,
        warehouse: String,
        new_quantity: Decimal,
        reason: Option<String>,
    },
    StockOut {
        barcode: String,
        warehouse: String,
        quantity: Decimal,
        reason: Option<String>,
    },
    StockAlertUpdate {
        barcode: String,
        warehouse: String,
        stock_alert_level: Decimal,
    },
    StockTransfer {
        barcode: String,
        from_warehouse: String,
        to_warehouse: String,
        quantity: Decimal,
        reference_doc: Option<String>,
    },
}

fn required_text(row: &ImportRow, column: &str) -> Result<String, String> {
    match row.get(column).map(|v| v.as_str()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(format!("Missing value for required column '{}'", column)),
    }
}

fn optional_text(row: &ImportRow, column: &str) -> Option<String> {
    row.get(column).filter(|v| !v.is_empty()).cloned()
}

fn required_decimal(row: &ImportRow, column: &str) -> Result<Decimal, String> {
    let raw = required_text(row, column)?;
    Decimal::from_str(&raw).map_err(|_| format!("Invalid number '{}' in column '{}'", raw, column))
}

fn optional_decimal(row: &ImportRow, column: &str) -> Result<Option<Decimal>, String> {
    match optional_text(row, column) {
        Some(raw) => Decimal::from_str(&raw)
            .map(Some)
            .map_err(|_| format!("Invalid number '{}' in column '{}'", raw, column)),
        None => Ok(None),
    }
}

fn optional_date(row: &ImportRow, column: &str) -> Result<Option<NaiveDate>, String> {
    match optional_text(row, column) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid date '{}' in column '{}' (expected YYYY-MM-DD)", raw, column)),
        None => Ok(None),
    }
}

fn optional_i32(row: &ImportRow, column: &str) -> Result<Option<i32>, String> {
    match optional_text(row, column) {
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("Invalid integer '{}' in column '{}'", raw, column)),
        None => Ok(None),
    }
}

/// Validate one normalized row against the import type's schema.
///
/// Positive-quantity rules mirror the ledger operations the rows feed into:
/// receive/issue/stock_out/transfer quantities must be > 0, adjustment targets
/// and alert levels only need to be finite numbers.
pub fn parse_row(import_type: ImportType, row: &ImportRow) -> Result<TypedImportRow, String> {
    let positive = |qty: Decimal, column: &str| -> Result<Decimal, String> {
        if qty <= Decimal::ZERO {
            Err(format!("Column '{}' must be greater than zero", column))
        } else {
            Ok(qty)
        }
    };

    match import_type {
        ImportType::FullUpsert => {
            let quantity = required_decimal(row, "quantity")?;
            if quantity < Decimal::ZERO {
                return Err("Column 'quantity' cannot be negative".to_string());
            }
            Ok(TypedImportRow::FullUpsert {
                barcode: required_text(row, "barcode")?,
                warehouse: required_text(row, "warehouse")?,
                item_name: required_text(row, "item_name")?,
                quantity,
                category: optional_text(row, "category"),
                stock_alert_level: optional_decimal(row, "stock_alert_level")?,
                expire_date: optional_date(row, "expire_date")?,
                expire_date_alert: optional_i32(row, "expire_date_alert")?,
            })
        }
        ImportType::StockReceive => Ok(TypedImportRow::StockReceive {
            barcode: required_text(row, "barcode")?,
            warehouse: required_text(row, "warehouse")?,
            quantity: positive(required_decimal(row, "quantity")?, "quantity")?,
            reference_doc: optional_text(row, "reference_doc"),
            reason: optional_text(row, "reason"),
        }),
        ImportType::StockIssue => Ok(TypedImportRow::StockIssue {
            barcode: required_text(row, "barcode")?,
            warehouse: required_text(row, "warehouse")?,
            quantity: positive(required_decimal(row, "quantity")?, "quantity")?,
            reference_doc: optional_text(row, "reference_doc"),
            reason: optional_text(row, "reason"),
        }),
        ImportType::Adjustment => Ok(TypedImportRow::Adjustment {
            barcode: required_text(row, "barcode")?,
            warehouse: required_text(row, "warehouse")?,
            new_quantity: required_decimal(row, "new_quantity")?,
            reason: optional_text(row, "reason"),
        }),
        ImportType::StockOut => Ok(TypedImportRow::StockOut {
            barcode: required_text(row, "barcode")?,
            warehouse: required_text(row, "warehouse")?,
            quantity: positive(required_decimal(row, "quantity")?, "quantity")?,
            reason: optional_text(row, "reason"),
        }),
        ImportType::StockAlertUpdate => {
            let level = required_decimal(row, "stock_alert_level")?;
            if level < Decimal::ZERO {
                return Err("Column 'stock_alert_level' cannot be negative".to_string());
            }
            Ok(TypedImportRow::StockAlertUpdate {
                barcode: required_text(row, "barcode")?,
                warehouse: required_text(row, "warehouse")?,
                stock_alert_level: level,
            })
        }
        ImportType::StockTransfer => Ok(TypedImportRow::StockTransfer {
            barcode: required_text(row, "barcode")?,
            from_warehouse: required_text(row, "from_warehouse")?,
            to_warehouse: required_text(row, "to_warehouse")?,
            quantity: positive(required_decimal(row, "quantity")?, "quantity")?,
            reference_doc: optional_text(row, "reference_doc"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> ImportRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_row_lowercases_headers() {
        let raw = row(&[("Barcode", " A1 "), ("WAREHOUSE", "Central")]);
        let normalized = normalize_row(&raw);
        assert_eq!(normalized.get("barcode").map(String::as_str), Some("A1"));
        assert_eq!(normalized.get("warehouse").map(String::as_str), Some("Central"));
    }

    #[test]
    fn test_missing_columns_reported() {
        let headers = row(&[("barcode", ""), ("warehouse", "")]);
        let missing = missing_columns(ImportType::StockReceive, &headers);
        assert_eq!(missing, vec!["quantity"]);
    }

    #[test]
    fn test_parse_receive_row() {
        let normalized = row(&[
            ("barcode", "A1"),
            ("warehouse", "Central"),
            ("quantity", "12.5"),
        ]);
        let typed = parse_row(ImportType::StockReceive, &normalized).unwrap();
        match typed {
            TypedImportRow::StockReceive { barcode, quantity, .. } => {
                assert_eq!(barcode, "A1");
                assert_eq!(quantity, Decimal::from_str("12.5").unwrap());
            }
            other => panic!("unexpected row: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_positive_quantity() {
        let normalized = row(&[
            ("barcode", "A1"),
            ("warehouse", "Central"),
            ("quantity", "0"),
        ]);
        assert!(parse_row(ImportType::StockIssue, &normalized).is_err());
    }

    #[test]
    fn test_adjustment_allows_negative_target() {
        let normalized = row(&[
            ("barcode", "A1"),
            ("warehouse", "Central"),
            ("new_quantity", "-4"),
        ]);
        assert!(parse_row(ImportType::Adjustment, &normalized).is_ok());
    }
}
