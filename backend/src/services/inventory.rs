//! Inventory ledger service
//!
//! Every quantity change is paired with an immutable stock transaction in one
//! database transaction: the balance update and the log append commit together
//! or not at all. The record row is locked `FOR UPDATE` so concurrent callers
//! serialize per (barcode, warehouse) and the balance never diverges from the
//! signed sum of its committed transactions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    low_stock_after_receive, low_stock_crossing, AlertPriority, AlertType, InventoryRecord,
    StockTransaction, TransactionType,
};
use shared::validation::{validate_barcode, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::services::notification::{NotificationService, StockAlertNotification};

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    notifier: Option<NotificationService>,
    allow_non_central_receive: bool,
}

/// Input for receiving stock into a warehouse
#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub barcode: String,
    pub warehouse: String,
    pub quantity: Decimal,
    /// Required when the receipt creates the inventory record
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub stock_alert_level: Option<Decimal>,
    pub expire_date: Option<NaiveDate>,
    pub expire_date_alert: Option<i32>,
    pub reference_doc: Option<String>,
    pub reason: Option<String>,
    /// Authorized override of the central-warehouse receive policy
    pub override_receive_policy: Option<bool>,
}

/// Input for issuing stock out of a warehouse
#[derive(Debug, Deserialize)]
pub struct IssueInput {
    pub barcode: String,
    pub warehouse: String,
    pub quantity: Decimal,
    pub reference_doc: Option<String>,
    pub reason: Option<String>,
}

/// Input for setting an absolute quantity
#[derive(Debug, Deserialize)]
pub struct AdjustInput {
    pub barcode: String,
    pub warehouse: String,
    pub new_quantity: Decimal,
    pub reason: String,
}

/// Result of the chunked reset-to-zero operation.
///
/// The overall run is not atomic: each chunk commits on its own, and a
/// failure mid-run leaves prior chunks committed. The counts always reflect
/// what actually committed.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResetResult {
    pub items_reset: u64,
    pub transactions_created: u64,
    /// Set when a chunk failed and the run stopped early
    pub aborted: Option<String>,
}

pub(crate) type RecordRow = (
    Uuid,
    String,
    String,
    String,
    Option<String>,
    Decimal,
    Decimal,
    Option<NaiveDate>,
    i32,
    DateTime<Utc>,
    DateTime<Utc>,
);

pub(crate) fn map_record(r: RecordRow) -> InventoryRecord {
    InventoryRecord {
        id: r.0,
        barcode: r.1,
        warehouse_name: r.2,
        item_name: r.3,
        category: r.4,
        stock_qty: r.5,
        stock_alert_level: r.6,
        expire_date: r.7,
        expire_date_alert: r.8,
        created_at: r.9,
        updated_at: r.10,
    }
}

type TransactionRow = (
    Uuid,
    Uuid,
    String,
    Decimal,
    DateTime<Utc>,
    Option<String>,
    Option<String>,
    Uuid,
    Option<Uuid>,
    Option<Uuid>,
    DateTime<Utc>,
);

fn map_transaction(r: TransactionRow) -> AppResult<StockTransaction> {
    let transaction_type = TransactionType::from_str(&r.2)
        .ok_or_else(|| AppError::Internal(format!("Unknown transaction type '{}'", r.2)))?;
    Ok(StockTransaction {
        id: r.0,
        inventory_id: r.1,
        transaction_type,
        quantity: r.3,
        transaction_date: r.4,
        reference_doc: r.5,
        reason: r.6,
        processed_by: r.7,
        from_warehouse_id: r.8,
        to_warehouse_id: r.9,
        created_at: r.10,
    })
}

/// Lock an inventory record row for the rest of the transaction
pub(crate) async fn lock_record(
    tx: &mut Transaction<'_, Postgres>,
    barcode: &str,
    warehouse: &str,
) -> AppResult<Option<InventoryRecord>> {
    let row = sqlx::query_as::<_, RecordRow>(
        r#"
        SELECT id, barcode, warehouse_name, item_name, category, stock_qty, stock_alert_level,
               expire_date, expire_date_alert, created_at, updated_at
        FROM inventory_records
        WHERE barcode = $1 AND warehouse_name = $2
        FOR UPDATE
        "#,
    )
    .bind(barcode)
    .bind(warehouse)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(map_record))
}

/// Append one stock transaction row inside an open transaction
#[allow(clippy::too_many_arguments)]
pub(crate) async fn append_transaction(
    tx: &mut Transaction<'_, Postgres>,
    inventory_id: Uuid,
    tx_type: TransactionType,
    signed_quantity: Decimal,
    reference_doc: Option<&str>,
    reason: Option<&str>,
    processed_by: Uuid,
    from_warehouse_id: Option<Uuid>,
    to_warehouse_id: Option<Uuid>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_transactions
            (inventory_id, transaction_type, quantity, transaction_date, reference_doc,
             reason, processed_by, from_warehouse_id, to_warehouse_id)
        VALUES ($1, $2, $3, NOW(), $4, $5, $6, $7, $8)
        "#,
    )
    .bind(inventory_id)
    .bind(tx_type.as_str())
    .bind(signed_quantity)
    .bind(reference_doc)
    .bind(reason)
    .bind(processed_by)
    .bind(from_warehouse_id)
    .bind(to_warehouse_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Apply a signed delta to a locked record's balance
pub(crate) async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    inventory_id: Uuid,
    delta: Decimal,
) -> AppResult<InventoryRecord> {
    let row = sqlx::query_as::<_, RecordRow>(
        r#"
        UPDATE inventory_records
        SET stock_qty = stock_qty + $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, barcode, warehouse_name, item_name, category, stock_qty, stock_alert_level,
                  expire_date, expire_date_alert, created_at, updated_at
        "#,
    )
    .bind(delta)
    .bind(inventory_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(map_record(row))
}

/// Whether an unacknowledged low-stock alert already exists for a record
pub(crate) async fn has_pending_low_stock_alert(
    tx: &mut Transaction<'_, Postgres>,
    inventory_id: Uuid,
) -> AppResult<bool> {
    let pending = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM alert_logs
            WHERE inventory_id = $1 AND alert_type = $2 AND acknowledged = false
        )
        "#,
    )
    .bind(inventory_id)
    .bind(AlertType::LowStock.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(pending)
}

/// Write a low-stock alert log entry inside an open transaction
pub(crate) async fn insert_low_stock_alert(
    tx: &mut Transaction<'_, Postgres>,
    record: &InventoryRecord,
    priority: AlertPriority,
) -> AppResult<()> {
    let message = format!(
        "Stock for {} at {} is {} (alert level {})",
        record.item_name, record.warehouse_name, record.stock_qty, record.stock_alert_level
    );
    let message_th = format!(
        "สต็อกของ {} ที่คลัง {} เหลือ {} (เกณฑ์แจ้งเตือน {})",
        record.item_name, record.warehouse_name, record.stock_qty, record.stock_alert_level
    );

    sqlx::query(
        r#"
        INSERT INTO alert_logs (alert_type, priority, message, message_th, inventory_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(AlertType::LowStock.as_str())
    .bind(priority.as_str())
    .bind(message)
    .bind(message_th)
    .bind(record.id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            notifier: None,
            allow_non_central_receive: false,
        }
    }

    /// Attach the best-effort email notifier
    pub fn with_notifier(mut self, notifier: NotificationService) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Configure the central-warehouse receive policy
    pub fn with_receive_policy(mut self, allow_non_central_receive: bool) -> Self {
        self.allow_non_central_receive = allow_non_central_receive;
        self
    }

    fn validate_operation(&self, barcode: &str, quantity: Decimal) -> AppResult<()> {
        if let Err(msg) = validate_barcode(barcode) {
            return Err(AppError::Validation {
                field: "barcode".to_string(),
                message: msg.to_string(),
                message_th: "บาร์โค้ดไม่ถูกต้อง".to_string(),
            });
        }
        if validate_positive_quantity(quantity).is_err() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be greater than zero".to_string(),
                message_th: "ปริมาณต้องมากกว่าศูนย์".to_string(),
            });
        }
        Ok(())
    }

    /// Post-commit low-stock side effect: the alert log row was written inside
    /// the transaction; email delivery is fire-and-forget.
    fn notify_low_stock(&self, record: &InventoryRecord, priority: AlertPriority) {
        if let Some(notifier) = &self.notifier {
            notifier.send_stock_alert_background(StockAlertNotification {
                priority,
                item_name: record.item_name.clone(),
                barcode: record.barcode.clone(),
                warehouse_name: record.warehouse_name.clone(),
                stock_qty: record.stock_qty,
                stock_alert_level: record.stock_alert_level,
            });
        }
    }

    /// Receive stock into a warehouse, creating the inventory record on first
    /// receipt
    pub async fn receive(&self, input: ReceiveInput, actor: Uuid) -> AppResult<InventoryRecord> {
        self.validate_operation(&input.barcode, input.quantity)?;

        let warehouse = sqlx::query_as::<_, (Uuid, bool, bool)>(
            "SELECT id, is_central, is_active FROM warehouses WHERE name = $1",
        )
        .bind(&input.warehouse)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        if !warehouse.2 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        // Receive-time policy gate only; transfers are exempt.
        let override_policy = input.override_receive_policy.unwrap_or(false);
        if !warehouse.1 && !self.allow_non_central_receive && !override_policy {
            return Err(AppError::PolicyViolation {
                message: format!(
                    "Warehouse {} is not central; stock must be received centrally and transferred",
                    input.warehouse
                ),
                message_th: format!(
                    "คลัง {} ไม่ใช่คลังกลาง ต้องรับสินค้าเข้าคลังกลางแล้วโอนย้าย",
                    input.warehouse
                ),
            });
        }

        let mut tx = self.db.begin().await?;

        let record = match lock_record(&mut tx, &input.barcode, &input.warehouse).await? {
            Some(record) => record,
            None => {
                let item_name = input.item_name.clone().filter(|n| !n.trim().is_empty()).ok_or(
                    AppError::Validation {
                        field: "item_name".to_string(),
                        message: "item_name is required when receiving a new item".to_string(),
                        message_th: "ต้องระบุชื่อสินค้าเมื่อรับสินค้าใหม่".to_string(),
                    },
                )?;

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
                .bind(&input.warehouse)
                .bind(&item_name)
                .bind(&input.category)
                .bind(input.stock_alert_level.unwrap_or(Decimal::ZERO))
                .bind(input.expire_date)
                .bind(input.expire_date_alert.unwrap_or(0))
                .fetch_one(&mut *tx)
                .await?;

                map_record(row)
            }
        };

        append_transaction(
            &mut tx,
            record.id,
            TransactionType::Receive,
            input.quantity,
            input.reference_doc.as_deref(),
            input.reason.as_deref(),
            actor,
            None,
            Some(warehouse.0),
        )
        .await?;

        let updated = apply_delta(&mut tx, record.id, input.quantity).await?;

        // A receive never crosses the threshold from above, so the crossing
        // rule does not apply here; alert directly when the balance still
        // sits inside the band and no alert is pending.
        let alert_pending = has_pending_low_stock_alert(&mut tx, record.id).await?;
        let alerted = low_stock_after_receive(
            updated.stock_qty,
            updated.stock_alert_level,
            alert_pending,
        );
        if let Some(priority) = alerted {
            insert_low_stock_alert(&mut tx, &updated, priority).await?;
        }

        tx.commit().await?;

        if let Some(priority) = alerted {
            self.notify_low_stock(&updated, priority);
        }

        Ok(updated)
    }

    /// Issue stock out of a warehouse.
    ///
    /// The ledger does not hard-block a negative result; callers with a
    /// non-negative policy must check the balance before invoking.
    pub async fn issue(&self, input: IssueInput, actor: Uuid) -> AppResult<InventoryRecord> {
        self.validate_operation(&input.barcode, input.quantity)?;

        let mut tx = self.db.begin().await?;

        let record = lock_record(&mut tx, &input.barcode, &input.warehouse)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        append_transaction(
            &mut tx,
            record.id,
            TransactionType::Issue,
            -input.quantity,
            input.reference_doc.as_deref(),
            input.reason.as_deref(),
            actor,
            None,
            None,
        )
        .await?;

        let updated = apply_delta(&mut tx, record.id, -input.quantity).await?;

        let crossing = low_stock_crossing(
            record.stock_qty,
            updated.stock_qty,
            updated.stock_alert_level,
        );
        if let Some(priority) = crossing {
            insert_low_stock_alert(&mut tx, &updated, priority).await?;
        }

        tx.commit().await?;

        if let Some(priority) = crossing {
            self.notify_low_stock(&updated, priority);
        }

        Ok(updated)
    }

    /// Remove stock permanently (damage, expiry, loss). Same ledger shape as
    /// an issue but logged with its own type for reporting.
    pub async fn stock_out(&self, input: IssueInput, actor: Uuid) -> AppResult<InventoryRecord> {
        self.validate_operation(&input.barcode, input.quantity)?;

        let mut tx = self.db.begin().await?;

        let record = lock_record(&mut tx, &input.barcode, &input.warehouse)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        append_transaction(
            &mut tx,
            record.id,
            TransactionType::StockOut,
            -input.quantity,
            input.reference_doc.as_deref(),
            input.reason.as_deref(),
            actor,
            None,
            None,
        )
        .await?;

        let updated = apply_delta(&mut tx, record.id, -input.quantity).await?;

        let crossing = low_stock_crossing(
            record.stock_qty,
            updated.stock_qty,
            updated.stock_alert_level,
        );
        if let Some(priority) = crossing {
            insert_low_stock_alert(&mut tx, &updated, priority).await?;
        }

        tx.commit().await?;

        if let Some(priority) = crossing {
            self.notify_low_stock(&updated, priority);
        }

        Ok(updated)
    }

    /// Set an absolute quantity; the logged adjustment stores the delta so the
    /// ledger still sums to the balance
    pub async fn adjust(&self, input: AdjustInput, actor: Uuid) -> AppResult<InventoryRecord> {
        if input.reason.trim().is_empty() {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: "A reason is required for adjustments".to_string(),
                message_th: "ต้องระบุเหตุผลในการปรับยอด".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let record = lock_record(&mut tx, &input.barcode, &input.warehouse)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        let delta = input.new_quantity - record.stock_qty;

        append_transaction(
            &mut tx,
            record.id,
            TransactionType::Adjustment,
            delta,
            None,
            Some(&input.reason),
            actor,
            None,
            None,
        )
        .await?;

        let updated = apply_delta(&mut tx, record.id, delta).await?;

        let crossing = low_stock_crossing(
            record.stock_qty,
            updated.stock_qty,
            updated.stock_alert_level,
        );
        if let Some(priority) = crossing {
            insert_low_stock_alert(&mut tx, &updated, priority).await?;
        }

        tx.commit().await?;

        if let Some(priority) = crossing {
            self.notify_low_stock(&updated, priority);
        }

        Ok(updated)
    }

    /// Reset every non-zero balance to zero in bounded chunks.
    ///
    /// Each chunk is one transaction; the overall run is intentionally not
    /// atomic so lock scope stays bounded on large datasets. Running it twice
    /// in a row resets nothing on the second pass.
    pub async fn bulk_reset_to_zero(
        &self,
        actor: Uuid,
        reason: &str,
        chunk_size: u32,
    ) -> AppResult<BulkResetResult> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation {
                field: "reason".to_string(),
                message: "A reason is required for a bulk reset".to_string(),
                message_th: "ต้องระบุเหตุผลในการล้างยอดทั้งหมด".to_string(),
            });
        }
        let chunk_size = chunk_size.max(1) as i64;

        let mut result = BulkResetResult {
            items_reset: 0,
            transactions_created: 0,
            aborted: None,
        };

        loop {
            let outcome = self.reset_chunk(actor, reason, chunk_size).await;
            match outcome {
                Ok(0) => break,
                Ok(n) => {
                    result.items_reset += n;
                    result.transactions_created += n;
                }
                Err(e) => {
                    // Prior chunks stay committed; report partial progress.
                    tracing::error!("Bulk reset chunk failed: {}", e);
                    result.aborted = Some(e.to_string());
                    break;
                }
            }
        }

        Ok(result)
    }

    async fn reset_chunk(&self, actor: Uuid, reason: &str, chunk_size: i64) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, stock_qty
            FROM inventory_records
            WHERE stock_qty <> 0
            ORDER BY id
            LIMIT $1
            FOR UPDATE
            "#,
        )
        .bind(chunk_size)
        .fetch_all(&mut *tx)
        .await?;

        if rows.is_empty() {
            tx.commit().await?;
            return Ok(0);
        }

        for (id, qty) in &rows {
            append_transaction(
                &mut tx,
                *id,
                TransactionType::Adjustment,
                -*qty,
                None,
                Some(reason),
                actor,
                None,
                None,
            )
            .await?;
        }

        let ids: Vec<Uuid> = rows.iter().map(|(id, _)| *id).collect();
        sqlx::query(
            "UPDATE inventory_records SET stock_qty = 0, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(rows.len() as u64)
    }

    /// Get an inventory record by its composite key
    pub async fn get_record(&self, barcode: &str, warehouse: &str) -> AppResult<InventoryRecord> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, barcode, warehouse_name, item_name, category, stock_qty, stock_alert_level,
                   expire_date, expire_date_alert, created_at, updated_at
            FROM inventory_records
            WHERE barcode = $1 AND warehouse_name = $2
            "#,
        )
        .bind(barcode)
        .bind(warehouse)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(map_record(row))
    }

    /// List inventory records, optionally for one warehouse
    pub async fn list_records(&self, warehouse: Option<&str>) -> AppResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, barcode, warehouse_name, item_name, category, stock_qty, stock_alert_level,
                   expire_date, expire_date_alert, created_at, updated_at
            FROM inventory_records
            WHERE $1::TEXT IS NULL OR warehouse_name = $1
            ORDER BY warehouse_name, item_name
            "#,
        )
        .bind(warehouse)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_record).collect())
    }

    /// Get the transaction log for a record, newest first
    pub async fn get_transactions(
        &self,
        barcode: &str,
        warehouse: &str,
    ) -> AppResult<Vec<StockTransaction>> {
        let record = self.get_record(barcode, warehouse).await?;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, inventory_id, transaction_type, quantity, transaction_date, reference_doc,
                   reason, processed_by, from_warehouse_id, to_warehouse_id, created_at
            FROM stock_transactions
            WHERE inventory_id = $1
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(record.id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_transaction).collect()
    }

    /// Update the low-stock alert threshold for a record
    pub async fn update_alert_level(
        &self,
        barcode: &str,
        warehouse: &str,
        stock_alert_level: Decimal,
    ) -> AppResult<InventoryRecord> {
        if stock_alert_level < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "stock_alert_level".to_string(),
                message: "Alert level cannot be negative".to_string(),
                message_th: "เกณฑ์แจ้งเตือนต้องไม่ติดลบ".to_string(),
            });
        }

        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            UPDATE inventory_records
            SET stock_alert_level = $1, updated_at = NOW()
            WHERE barcode = $2 AND warehouse_name = $3
            RETURNING id, barcode, warehouse_name, item_name, category, stock_qty,
                      stock_alert_level, expire_date, expire_date_alert, created_at, updated_at
            "#,
        )
        .bind(stock_alert_level)
        .bind(barcode)
        .bind(warehouse)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        Ok(map_record(row))
    }
}
