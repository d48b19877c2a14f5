//! Batch (lot) tracking service
//!
//! Batches carry a hard quantity invariant, 0 <= remaining <= received, that
//! is enforced on every operation while the batch row is locked. Batch
//! quantities are an independent ledger from the parent inventory record's
//! balance; no cross-check ties the two together.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    batch_expiry_priority, derive_transfer_batch_number, AlertPriority, AlertType, Batch,
    BatchQuantityError, BatchTransaction, TransactionType,
};
use shared::validation::{validate_batch_number, validate_positive_quantity};

use crate::error::{AppError, AppResult};

/// Batch tracking service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
    expiry_window_days: i64,
}

/// Input for creating a batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub batch_number: String,
    pub barcode: String,
    pub warehouse: String,
    pub quantity: Decimal,
    pub expiry_date: NaiveDate,
    pub manufacture_date: Option<NaiveDate>,
    pub supplier_info: Option<String>,
    pub lot_number: Option<String>,
    pub cost_per_unit: Option<Decimal>,
}

/// Input for a quantity change on a batch
#[derive(Debug, Deserialize)]
pub struct BatchTransactionInput {
    pub transaction_type: TransactionType,
    /// Positive operation amount; absolute target for adjustments
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub reference_doc: Option<String>,
}

/// Result of the chunked expired-batch sweep.
///
/// Each chunk commits on its own, so a failure mid-run leaves earlier chunks
/// deactivated; the count always reflects what actually committed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeactivationResult {
    pub batches_deactivated: u64,
    /// Set when a chunk failed and the run stopped early
    pub aborted: Option<String>,
}

/// Input for transferring part of a batch to another warehouse
#[derive(Debug, Deserialize)]
pub struct BatchTransferInput {
    pub batch_number: String,
    pub to_warehouse: String,
    pub quantity: Decimal,
    pub reference_doc: Option<String>,
    pub reason: Option<String>,
}

type BatchRow = (
    Uuid,
    String,
    Uuid,
    Uuid,
    Decimal,
    Decimal,
    Option<NaiveDate>,
    NaiveDate,
    Option<String>,
    Option<String>,
    Option<Decimal>,
    bool,
    Uuid,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn map_batch(r: BatchRow) -> Batch {
    Batch {
        id: r.0,
        batch_number: r.1,
        inventory_id: r.2,
        warehouse_id: r.3,
        quantity_received: r.4,
        quantity_remaining: r.5,
        manufacture_date: r.6,
        expiry_date: r.7,
        supplier_info: r.8,
        lot_number: r.9,
        cost_per_unit: r.10,
        is_active: r.11,
        created_by: r.12,
        created_at: r.13,
        updated_at: r.14,
    }
}

fn quantity_error(e: BatchQuantityError, batch_number: &str) -> AppError {
    match e {
        BatchQuantityError::Insufficient => AppError::InsufficientStock(format!(
            "Batch {} does not hold enough remaining quantity",
            batch_number
        )),
        BatchQuantityError::OutOfRange => AppError::Validation {
            field: "quantity".to_string(),
            message: format!(
                "Operation would push batch {} outside its received quantity",
                batch_number
            ),
            message_th: format!("ปริมาณของล็อต {} จะเกินช่วงที่รับเข้า", batch_number),
        },
        BatchQuantityError::NonPositive => AppError::Validation {
            field: "quantity".to_string(),
            message: "Quantity must be greater than zero".to_string(),
            message_th: "ปริมาณต้องมากกว่าศูนย์".to_string(),
        },
    }
}

async fn lock_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_number: &str,
) -> AppResult<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(
        r#"
        SELECT id, batch_number, inventory_id, warehouse_id, quantity_received, quantity_remaining,
               manufacture_date, expiry_date, supplier_info, lot_number, cost_per_unit,
               is_active, created_by, created_at, updated_at
        FROM batches
        WHERE batch_number = $1
        FOR UPDATE
        "#,
    )
    .bind(batch_number)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(map_batch))
}

async fn append_batch_transaction(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    tx_type: TransactionType,
    signed_quantity: Decimal,
    reason: Option<&str>,
    reference_doc: Option<&str>,
    processed_by: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO batch_transactions
            (batch_id, transaction_type, quantity, reason, reference_doc, processed_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(batch_id)
    .bind(tx_type.as_str())
    .bind(signed_quantity)
    .bind(reason)
    .bind(reference_doc)
    .bind(processed_by)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn set_batch_remaining(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    remaining: Decimal,
) -> AppResult<Batch> {
    let row = sqlx::query_as::<_, BatchRow>(
        r#"
        UPDATE batches
        SET quantity_remaining = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, batch_number, inventory_id, warehouse_id, quantity_received,
                  quantity_remaining, manufacture_date, expiry_date, supplier_info, lot_number,
                  cost_per_unit, is_active, created_by, created_at, updated_at
        "#,
    )
    .bind(remaining)
    .bind(batch_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(map_batch(row))
}

async fn insert_batch_alert(
    tx: &mut Transaction<'_, Postgres>,
    batch: &Batch,
    priority: AlertPriority,
    days_until_expiry: i64,
) -> AppResult<()> {
    let message = if days_until_expiry < 0 {
        format!("Batch {} is already expired", batch.batch_number)
    } else {
        format!(
            "Batch {} expires in {} days",
            batch.batch_number, days_until_expiry
        )
    };
    let message_th = if days_until_expiry < 0 {
        format!("ล็อต {} หมดอายุแล้ว", batch.batch_number)
    } else {
        format!(
            "ล็อต {} จะหมดอายุในอีก {} วัน",
            batch.batch_number, days_until_expiry
        )
    };

    sqlx::query(
        r#"
        INSERT INTO batch_alerts (alert_type, priority, message, message_th, batch_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(AlertType::BatchExpiring.as_str())
    .bind(priority.as_str())
    .bind(message)
    .bind(message_th)
    .bind(batch.id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool, expiry_window_days: i64) -> Self {
        Self {
            db,
            expiry_window_days,
        }
    }

    /// Create a batch tied to an existing inventory record.
    ///
    /// If the expiry date already falls inside the alert window, a batch
    /// alert is written in the same transaction.
    pub async fn create_batch(&self, input: CreateBatchInput, actor: Uuid) -> AppResult<Batch> {
        if let Err(msg) = validate_batch_number(&input.batch_number) {
            return Err(AppError::Validation {
                field: "batch_number".to_string(),
                message: msg.to_string(),
                message_th: "หมายเลขล็อตไม่ถูกต้อง".to_string(),
            });
        }
        if validate_positive_quantity(input.quantity).is_err() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be greater than zero".to_string(),
                message_th: "ปริมาณต้องมากกว่าศูนย์".to_string(),
            });
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM batches WHERE batch_number = $1)",
        )
        .bind(&input.batch_number)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(AppError::DuplicateEntry("batch number".to_string()));
        }

        let target = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT r.id, w.id
            FROM inventory_records r
            JOIN warehouses w ON w.name = r.warehouse_name
            WHERE r.barcode = $1 AND r.warehouse_name = $2 AND w.is_active = true
            "#,
        )
        .bind(&input.barcode)
        .bind(&input.warehouse)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Inventory record for {} at {}",
                input.barcode, input.warehouse
            ))
        })?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches
                (batch_number, inventory_id, warehouse_id, quantity_received, quantity_remaining,
                 manufacture_date, expiry_date, supplier_info, lot_number, cost_per_unit,
                 created_by)
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, batch_number, inventory_id, warehouse_id, quantity_received,
                      quantity_remaining, manufacture_date, expiry_date, supplier_info,
                      lot_number, cost_per_unit, is_active, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.batch_number)
        .bind(target.0)
        .bind(target.1)
        .bind(input.quantity)
        .bind(input.manufacture_date)
        .bind(input.expiry_date)
        .bind(&input.supplier_info)
        .bind(&input.lot_number)
        .bind(input.cost_per_unit)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        let batch = map_batch(row);

        append_batch_transaction(
            &mut tx,
            batch.id,
            TransactionType::Receive,
            input.quantity,
            None,
            None,
            actor,
        )
        .await?;

        let days = (batch.expiry_date - Utc::now().date_naive()).num_days();
        if let Some(priority) = batch_expiry_priority(days, self.expiry_window_days) {
            insert_batch_alert(&mut tx, &batch, priority, days).await?;
        }

        tx.commit().await?;

        Ok(batch)
    }

    /// Apply a quantity change to a batch, enforcing the remaining-quantity
    /// invariant under a row lock
    pub async fn record_transaction(
        &self,
        batch_number: &str,
        input: BatchTransactionInput,
        actor: Uuid,
    ) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;

        let batch = lock_batch(&mut tx, batch_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_number)))?;

        if !batch.is_active {
            return Err(AppError::Conflict {
                resource: "batch".to_string(),
                message: format!("Batch {} is deactivated", batch_number),
                message_th: format!("ล็อต {} ถูกปิดใช้งานแล้ว", batch_number),
            });
        }

        let next = shared::models::next_batch_remaining(
            batch.quantity_remaining,
            batch.quantity_received,
            input.transaction_type,
            input.quantity,
        )
        .map_err(|e| quantity_error(e, batch_number))?;

        // Adjustments log the delta so the batch ledger still sums correctly.
        let logged = match input.transaction_type {
            TransactionType::Adjustment => next - batch.quantity_remaining,
            t if t.is_outgoing() || t == TransactionType::Transfer => -input.quantity,
            _ => input.quantity,
        };

        append_batch_transaction(
            &mut tx,
            batch.id,
            input.transaction_type,
            logged,
            input.reason.as_deref(),
            input.reference_doc.as_deref(),
            actor,
        )
        .await?;

        let updated = set_batch_remaining(&mut tx, batch.id, next).await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Move part of a batch to another warehouse.
    ///
    /// Deducts from the source batch and creates a destination batch with a
    /// derived batch number, both in one transaction. The destination batch
    /// keeps the source's expiry and supplier metadata.
    pub async fn transfer_batch(
        &self,
        input: BatchTransferInput,
        actor: Uuid,
    ) -> AppResult<(Batch, Batch)> {
        if validate_positive_quantity(input.quantity).is_err() {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Transfer quantity must be greater than zero".to_string(),
                message_th: "ปริมาณโอนย้ายต้องมากกว่าศูนย์".to_string(),
            });
        }

        let dest = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM warehouses WHERE name = $1 AND is_active = true",
        )
        .bind(&input.to_warehouse)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Warehouse {}", input.to_warehouse)))?;

        let mut tx = self.db.begin().await?;

        let source = lock_batch(&mut tx, &input.batch_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", input.batch_number)))?;

        if !source.is_active {
            return Err(AppError::Conflict {
                resource: "batch".to_string(),
                message: format!("Batch {} is deactivated", input.batch_number),
                message_th: format!("ล็อต {} ถูกปิดใช้งานแล้ว", input.batch_number),
            });
        }
        if source.warehouse_id == dest.0 {
            return Err(AppError::Validation {
                field: "to_warehouse".to_string(),
                message: "Source and destination warehouse must differ".to_string(),
                message_th: "คลังต้นทางและปลายทางต้องต่างกัน".to_string(),
            });
        }

        let next_remaining = shared::models::next_batch_remaining(
            source.quantity_remaining,
            source.quantity_received,
            TransactionType::Transfer,
            input.quantity,
        )
        .map_err(|e| quantity_error(e, &input.batch_number))?;

        // Destination batches attach to the destination warehouse's record
        // for the same item, created lazily like stock transfers do.
        let source_item = sqlx::query_as::<_, (String, String, Option<String>, Decimal, i32)>(
            r#"
            SELECT barcode, item_name, category, stock_alert_level, expire_date_alert
            FROM inventory_records
            WHERE id = $1
            "#,
        )
        .bind(source.inventory_id)
        .fetch_one(&mut *tx)
        .await?;

        let dest_inventory_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_records WHERE barcode = $1 AND warehouse_name = $2",
        )
        .bind(&source_item.0)
        .bind(&dest.1)
        .fetch_optional(&mut *tx)
        .await?;

        let dest_inventory_id = match dest_inventory_id {
            Some(id) => id,
            None => {
                sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO inventory_records
                        (barcode, warehouse_name, item_name, category, stock_qty,
                         stock_alert_level, expire_date, expire_date_alert)
                    VALUES ($1, $2, $3, $4, 0, $5, NULL, $6)
                    RETURNING id
                    "#,
                )
                .bind(&source_item.0)
                .bind(&dest.1)
                .bind(&source_item.1)
                .bind(&source_item.2)
                .bind(source_item.3)
                .bind(source_item.4)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        append_batch_transaction(
            &mut tx,
            source.id,
            TransactionType::Transfer,
            -input.quantity,
            input.reason.as_deref(),
            input.reference_doc.as_deref(),
            actor,
        )
        .await?;

        let updated_source = set_batch_remaining(&mut tx, source.id, next_remaining).await?;

        let derived_number = derive_transfer_batch_number(&source.batch_number, Utc::now());

        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches
                (batch_number, inventory_id, warehouse_id, quantity_received, quantity_remaining,
                 manufacture_date, expiry_date, supplier_info, lot_number, cost_per_unit,
                 created_by)
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, batch_number, inventory_id, warehouse_id, quantity_received,
                      quantity_remaining, manufacture_date, expiry_date, supplier_info,
                      lot_number, cost_per_unit, is_active, created_by, created_at, updated_at
            "#,
        )
        .bind(&derived_number)
        .bind(dest_inventory_id)
        .bind(dest.0)
        .bind(input.quantity)
        .bind(source.manufacture_date)
        .bind(source.expiry_date)
        .bind(&source.supplier_info)
        .bind(&source.lot_number)
        .bind(source.cost_per_unit)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        let dest_batch = map_batch(row);

        // The new batch opens with a receive for its full quantity, mirroring
        // a normal batch creation.
        append_batch_transaction(
            &mut tx,
            dest_batch.id,
            TransactionType::Receive,
            input.quantity,
            input.reason.as_deref(),
            input.reference_doc.as_deref(),
            actor,
        )
        .await?;

        let days = (dest_batch.expiry_date - Utc::now().date_naive()).num_days();
        if let Some(priority) = batch_expiry_priority(days, self.expiry_window_days) {
            insert_batch_alert(&mut tx, &dest_batch, priority, days).await?;
        }

        tx.commit().await?;

        Ok((updated_source, dest_batch))
    }

    /// Deactivate every active batch expired as of the given date, in bounded
    /// chunks. Deactivation is terminal and idempotent; a second run finds
    /// nothing to do.
    pub async fn deactivate_expired(
        &self,
        as_of: NaiveDate,
        chunk_size: u32,
    ) -> AppResult<BatchDeactivationResult> {
        let chunk_size = chunk_size.max(1) as i64;

        let mut result = BatchDeactivationResult {
            batches_deactivated: 0,
            aborted: None,
        };

        loop {
            match self.deactivate_expired_chunk(as_of, chunk_size).await {
                Ok(n) => {
                    result.batches_deactivated += n;
                    if n < chunk_size as u64 {
                        break;
                    }
                }
                Err(e) => {
                    // Prior chunks stay committed; report partial progress.
                    tracing::error!("Expired-batch sweep chunk failed: {}", e);
                    result.aborted = Some(e.to_string());
                    break;
                }
            }
        }

        Ok(result)
    }

    async fn deactivate_expired_chunk(&self, as_of: NaiveDate, chunk_size: i64) -> AppResult<u64> {
        let n = sqlx::query(
            r#"
            UPDATE batches
            SET is_active = false, updated_at = NOW()
            WHERE id IN (
                SELECT id FROM batches
                WHERE is_active = true AND expiry_date < $1
                ORDER BY id
                LIMIT $2
                FOR UPDATE
            )
            "#,
        )
        .bind(as_of)
        .bind(chunk_size)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok(n)
    }

    /// Get a batch by its unique number
    pub async fn get_batch(&self, batch_number: &str) -> AppResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, batch_number, inventory_id, warehouse_id, quantity_received,
                   quantity_remaining, manufacture_date, expiry_date, supplier_info, lot_number,
                   cost_per_unit, is_active, created_by, created_at, updated_at
            FROM batches
            WHERE batch_number = $1
            "#,
        )
        .bind(batch_number)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_number)))?;

        Ok(map_batch(row))
    }

    /// List batches for an inventory record, active first, soonest expiry first
    pub async fn list_batches(
        &self,
        inventory_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, batch_number, inventory_id, warehouse_id, quantity_received,
                   quantity_remaining, manufacture_date, expiry_date, supplier_info, lot_number,
                   cost_per_unit, is_active, created_by, created_at, updated_at
            FROM batches
            WHERE inventory_id = $1 AND (is_active = true OR $2)
            ORDER BY is_active DESC, expiry_date ASC
            "#,
        )
        .bind(inventory_id)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_batch).collect())
    }

    /// Get the transaction log for a batch, newest first
    pub async fn get_batch_transactions(
        &self,
        batch_number: &str,
    ) -> AppResult<Vec<BatchTransaction>> {
        let batch = self.get_batch(batch_number).await?;

        let rows = sqlx::query_as::<_, (
            Uuid,
            Uuid,
            String,
            Decimal,
            Option<String>,
            Option<String>,
            Uuid,
            DateTime<Utc>,
        )>(
            r#"
            SELECT id, batch_id, transaction_type, quantity, reason, reference_doc,
                   processed_by, created_at
            FROM batch_transactions
            WHERE batch_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(batch.id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                let transaction_type = TransactionType::from_str(&r.2).ok_or_else(|| {
                    AppError::Internal(format!("Unknown transaction type '{}'", r.2))
                })?;
                Ok(BatchTransaction {
                    id: r.0,
                    batch_id: r.1,
                    transaction_type,
                    quantity: r.3,
                    reason: r.4,
                    reference_doc: r.5,
                    processed_by: r.6,
                    created_at: r.7,
                })
            })
            .collect()
    }
}
