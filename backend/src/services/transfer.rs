//! Transfer coordinator
//!
//! Moves stock between warehouses atomically: source deduction, destination
//! addition, and both ledger rows commit in one database transaction, so a
//! transfer can never half-apply. The two transfer rows carry opposite signs
//! and net to zero across the movement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{low_stock_crossing, InventoryRecord, TransactionType};
use shared::validation::{validate_barcode, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{
    append_transaction, apply_delta, insert_low_stock_alert, lock_record, map_record, RecordRow,
};
use crate::services::notification::{NotificationService, StockAlertNotification};

/// Transfer coordinator service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    notifier: Option<NotificationService>,
}

/// Input for a warehouse-to-warehouse transfer
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub barcode: String,
    pub from_warehouse: String,
    pub to_warehouse: String,
    pub quantity: Decimal,
    pub reference_doc: Option<String>,
    pub reason: Option<String>,
}

/// How the destination record was obtained during a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLookup {
    /// The record already existed
    Found,
    /// The record was created lazily inside the transfer transaction
    Created,
}

/// Outcome of a committed transfer
#[derive(Debug, Serialize)]
pub struct TransferResult {
    pub source: InventoryRecord,
    pub destination: InventoryRecord,
    pub destination_lookup: RecordLookup,
}

async fn lock_record_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> AppResult<InventoryRecord> {
    let row = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT id, barcode, warehouse_name, item_name, category, stock_qty, stock_alert_level,
               expire_date, expire_date_alert, created_at, updated_at
        FROM inventory_records
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(map_record(row))
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db, notifier: None }
    }

    /// Attach the best-effort email notifier
    pub fn with_notifier(mut self, notifier: NotificationService) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Transfer stock between two warehouses.
    ///
    /// The source record must exist and hold at least the requested quantity.
    /// The destination record is created with the source's item metadata if it
    /// does not exist yet. Both rows are locked in ascending id order so
    /// opposite-direction transfers cannot deadlock.
    pub async fn transfer(&self, input: TransferInput, actor: Uuid) -> AppResult<TransferResult> {
        if let Err(msg) = validate_barcode(&input.barcode) {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: msg.to_string(),
                message_th: "บาร์โค้ดไม่ถูกต้อง".to_string(),
            });
        }
        if validate_positive_quantity(input.quantity).is_err() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Transfer quantity must be greater than zero".to_string(),
                message_th: "ปริมาณโอนย้ายต้องมากกว่าศูนย์".to_string(),
            });
        }
        if input.from_warehouse == input.to_warehouse {
            return Err(AppError::Validation {
                field: "to_warehouse".to_string(),
                message: "Source and destination warehouse must differ".to_string(),
                message_th: "คลังต้นทางและปลายทางต้องต่างกัน".to_string(),
            });
        }

        let from_wh = self.active_warehouse_id(&input.from_warehouse).await?;
        let to_wh = self.active_warehouse_id(&input.to_warehouse).await?;

        let mut tx = self.db.begin().await?;

        // Resolve both record ids first so existing rows can be locked in
        // ascending id order regardless of transfer direction.
        let source_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_records WHERE barcode = $1 AND warehouse_name = $2",
        )
        .bind(&input.barcode)
        .bind(&input.from_warehouse)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Inventory record for {} at {}",
                input.barcode, input.from_warehouse
            ))
        })?;

        let dest_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_records WHERE barcode = $1 AND warehouse_name = $2",
        )
        .bind(&input.barcode)
        .bind(&input.to_warehouse)
        .fetch_optional(&mut *tx)
        .await?;

        let (source, destination, destination_lookup) = match dest_id {
            Some(dest_id) => {
                let (first, second) = if source_id < dest_id {
                    (source_id, dest_id)
                } else {
                    (dest_id, source_id)
                };
                let first_rec = lock_record_by_id(&mut tx, first).await?;
                let second_rec = lock_record_by_id(&mut tx, second).await?;
                let (source, dest) = if first == source_id {
                    (first_rec, second_rec)
                } else {
                    (second_rec, first_rec)
                };
                (source, dest, RecordLookup::Found)
            }
            None => {
                let source = lock_record(&mut tx, &input.barcode, &input.from_warehouse)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "Inventory record for {} at {}",
                            input.barcode, input.from_warehouse
                        ))
                    })?;

                // A freshly inserted row is invisible to concurrent
                // transactions until commit, so its lock order is irrelevant.
                let row = sqlx::query_as::<_, RecordRow>(
                    r#"
                    INSERT INTO inventory_records
                        (barcode, warehouse_name, item_name, category, stock_qty,
                         stock_alert_level, expire_date, expire_date_alert)
                    VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
                    RETURNING id, barcode, warehouse_name, item_name, category, stock_qty,
                              stock_alert_level, expire_date, expire_date_alert,
                              created_at, updated_at
                    "#,
                )
                .bind(&input.barcode)
                .bind(&input.to_warehouse)
                .bind(&source.item_name)
                .bind(&source.category)
                .bind(source.stock_alert_level)
                .bind(source.expire_date)
                .bind(source.expire_date_alert)
                .fetch_one(&mut *tx)
                .await?;

                (source, map_record(row), RecordLookup::Created)
            }
        };

        if source.stock_qty < input.quantity {
            return Err(AppError::InsufficientStock(format!(
                "{} has {} at {}, cannot transfer {}",
                input.barcode, source.stock_qty, input.from_warehouse, input.quantity
            )));
        }

        append_transaction(
            &mut tx,
            source.id,
            TransactionType::Transfer,
            -input.quantity,
            input.reference_doc.as_deref(),
            input.reason.as_deref(),
            actor,
            Some(from_wh),
            Some(to_wh),
        )
        .await?;

        append_transaction(
            &mut tx,
            destination.id,
            TransactionType::Transfer,
            input.quantity,
            input.reference_doc.as_deref(),
            input.reason.as_deref(),
            actor,
            Some(from_wh),
            Some(to_wh),
        )
        .await?;

        let updated_source = apply_delta(&mut tx, source.id, -input.quantity).await?;
        let updated_dest = apply_delta(&mut tx, destination.id, input.quantity).await?;

        // Only the source side can newly fall below its threshold.
        let crossing = low_stock_crossing(
            source.stock_qty,
            updated_source.stock_qty,
            updated_source.stock_alert_level,
        );
        if let Some(priority) = crossing {
            insert_low_stock_alert(&mut tx, &updated_source, priority).await?;
        }

        tx.commit().await?;

        if let Some(priority) = crossing {
            if let Some(notifier) = &self.notifier {
                notifier.send_stock_alert_background(StockAlertNotification {
                    priority,
                    item_name: updated_source.item_name.clone(),
                    barcode: updated_source.barcode.clone(),
                    warehouse_name: updated_source.warehouse_name.clone(),
                    stock_qty: updated_source.stock_qty,
                    stock_alert_level: updated_source.stock_alert_level,
                });
            }
        }

        Ok(TransferResult {
            source: updated_source,
            destination: updated_dest,
            destination_lookup,
        })
    }

    async fn active_warehouse_id(&self, name: &str) -> AppResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM warehouses WHERE name = $1 AND is_active = true",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Warehouse {}", name)))
    }
}
