//! Bulk reconciliation engine
//!
//! Processes already-parsed tabular rows sequentially with per-row failure
//! isolation: each row commits or fails on its own, one bad row never rolls
//! back its neighbours. A job with any failed row is marked failed even when
//! most rows committed, so callers always inspect the counts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    missing_columns, normalize_row, parse_row, ImportJob, ImportRowError, ImportStatus,
    ImportType, TypedImportRow, IMPORT_HEADER_OFFSET,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{AdjustInput, InventoryService, IssueInput, ReceiveInput};
use crate::services::transfer::{TransferInput, TransferService};

/// Bulk reconciliation service
#[derive(Clone)]
pub struct ImportService {
    db: PgPool,
    inventory: InventoryService,
    transfer: TransferService,
}

/// Outcome of a finished import run
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub job: ImportJob,
    pub errors: Vec<ImportRowError>,
}

type JobRow = (
    Uuid,
    String,
    String,
    i32,
    i32,
    i32,
    String,
    Uuid,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn map_job(r: JobRow) -> AppResult<ImportJob> {
    let import_type = ImportType::from_str(&r.1)
        .ok_or_else(|| AppError::Internal(format!("Unknown import type '{}'", r.1)))?;
    let status = ImportStatus::from_str(&r.6)
        .ok_or_else(|| AppError::Internal(format!("Unknown import status '{}'", r.6)))?;
    Ok(ImportJob {
        id: r.0,
        import_type,
        filename: r.2,
        total_records: r.3,
        successful_records: r.4,
        failed_records: r.5,
        status,
        processed_by: r.7,
        created_at: r.8,
        completed_at: r.9,
    })
}

impl ImportService {
    /// Create a new ImportService instance
    pub fn new(db: PgPool, inventory: InventoryService, transfer: TransferService) -> Self {
        Self {
            db,
            inventory,
            transfer,
        }
    }

    /// Run a bulk import over parsed rows.
    ///
    /// Missing required columns reject the whole import before a job record
    /// exists. After that point every row is attempted: schema errors and
    /// ledger rejections are collected per row, tagged with the spreadsheet
    /// row number, and the job finishes with the aggregate counts.
    pub async fn run_import(
        &self,
        import_type: ImportType,
        filename: &str,
        raw_rows: &[HashMap<String, String>],
        actor: Uuid,
    ) -> AppResult<ImportReport> {
        let first = raw_rows.first().ok_or_else(|| {
            AppError::ValidationError("Import contains no data rows".to_string())
        })?;

        let headers = normalize_row(first);
        let missing = missing_columns(import_type, &headers);
        if !missing.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        let job_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO import_jobs (import_type, filename, total_records, status, processed_by)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING id
            "#,
        )
        .bind(import_type.as_str())
        .bind(filename)
        .bind(raw_rows.len() as i32)
        .bind(actor)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            job_id = %job_id,
            import_type = import_type.as_str(),
            rows = raw_rows.len(),
            "Starting bulk import"
        );

        // Request-scoped warehouse lookup cache; lives only for this run so a
        // warehouse created mid-run is picked up by the next import.
        let mut warehouse_cache: HashMap<String, bool> = HashMap::new();

        let mut errors: Vec<ImportRowError> = Vec::new();
        let mut successful = 0i32;

        for (index, raw) in raw_rows.iter().enumerate() {
            let row_number = index + 1 + IMPORT_HEADER_OFFSET;
            let normalized = normalize_row(raw);

            let outcome = match parse_row(import_type, &normalized) {
                Ok(typed) => self.apply_row(typed, &mut warehouse_cache, actor).await,
                Err(message) => Err(AppError::ValidationError(message)),
            };

            match outcome {
                Ok(()) => successful += 1,
                Err(e) => errors.push(ImportRowError {
                    row_number,
                    message: e.to_string(),
                }),
            }
        }

        let failed = errors.len() as i32;
        let status = if failed == 0 {
            ImportStatus::Completed
        } else {
            ImportStatus::Failed
        };

        // Persist row errors before finalizing the job; losing one detail row
        // must not fail a run whose mutations are already committed.
        for e in &errors {
            if let Err(db_err) = sqlx::query(
                "INSERT INTO import_row_errors (job_id, row_number, message) VALUES ($1, $2, $3)",
            )
            .bind(job_id)
            .bind(e.row_number as i32)
            .bind(&e.message)
            .execute(&self.db)
            .await
            {
                tracing::warn!(
                    job_id = %job_id,
                    row_number = e.row_number,
                    "Failed to persist import row error: {}",
                    db_err
                );
            }
        }

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE import_jobs
            SET successful_records = $1, failed_records = $2, status = $3, completed_at = NOW()
            WHERE id = $4
            RETURNING id, import_type, filename, total_records, successful_records,
                      failed_records, status, processed_by, created_at, completed_at
            "#,
        )
        .bind(successful)
        .bind(failed)
        .bind(status.as_str())
        .bind(job_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            job_id = %job_id,
            successful,
            failed,
            "Bulk import finished"
        );

        Ok(ImportReport {
            job: map_job(row)?,
            errors,
        })
    }

    async fn warehouse_exists(
        &self,
        cache: &mut HashMap<String, bool>,
        name: &str,
    ) -> AppResult<bool> {
        if let Some(known) = cache.get(name) {
            return Ok(*known);
        }
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE name = $1 AND is_active = true)",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await?;
        cache.insert(name.to_string(), exists);
        Ok(exists)
    }

    async fn require_warehouse(
        &self,
        cache: &mut HashMap<String, bool>,
        name: &str,
    ) -> AppResult<()> {
        if self.warehouse_exists(cache, name).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Warehouse {}", name)))
        }
    }

    async fn apply_row(
        &self,
        row: TypedImportRow,
        cache: &mut HashMap<String, bool>,
        actor: Uuid,
    ) -> AppResult<()> {
        match row {
            TypedImportRow::FullUpsert {
                barcode,
                warehouse,
                item_name,
                quantity,
                category,
                stock_alert_level,
                expire_date,
                expire_date_alert,
            } => {
                self.require_warehouse(cache, &warehouse).await?;
                match self.inventory.get_record(&barcode, &warehouse).await {
                    Ok(existing) => {
                        if existing.stock_qty != quantity {
                            self.inventory
                                .adjust(
                                    AdjustInput {
                                        barcode: barcode.clone(),
                                        warehouse: warehouse.clone(),
                                        new_quantity: quantity,
                                        reason: "Bulk import reconciliation".to_string(),
                                    },
                                    actor,
                                )
                                .await?;
                        }
                        if let Some(level) = stock_alert_level {
                            self.inventory
                                .update_alert_level(&barcode, &warehouse, level)
                                .await?;
                        }
                        Ok(())
                    }
                    Err(AppError::NotFound(_)) => {
                        if quantity.is_zero() {
                            // A zero balance needs no ledger entry; the empty
                            // transaction log already sums to zero.
                            sqlx::query(
                                r#"
                                INSERT INTO inventory_records
                                    (barcode, warehouse_name, item_name, category, stock_qty,
                                     stock_alert_level, expire_date, expire_date_alert)
                                VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
                                "#,
                            )
                            .bind(&barcode)
                            .bind(&warehouse)
                            .bind(&item_name)
                            .bind(&category)
                            .bind(stock_alert_level.unwrap_or(rust_decimal::Decimal::ZERO))
                            .bind(expire_date)
                            .bind(expire_date_alert.unwrap_or(0))
                            .execute(&self.db)
                            .await?;
                            return Ok(());
                        }
                        self.inventory
                            .receive(
                                ReceiveInput {
                                    barcode,
                                    warehouse,
                                    quantity,
                                    item_name: Some(item_name),
                                    category,
                                    stock_alert_level,
                                    expire_date,
                                    expire_date_alert,
                                    reference_doc: None,
                                    reason: Some("Bulk import reconciliation".to_string()),
                                    override_receive_policy: Some(true),
                                },
                                actor,
                            )
                            .await
                            .map(|_| ())
                    }
                    Err(e) => Err(e),
                }
            }
            TypedImportRow::StockReceive {
                barcode,
                warehouse,
                quantity,
                reference_doc,
                reason,
            } => {
                self.require_warehouse(cache, &warehouse).await?;
                self.inventory
                    .receive(
                        ReceiveInput {
                            barcode,
                            warehouse,
                            quantity,
                            item_name: None,
                            category: None,
                            stock_alert_level: None,
                            expire_date: None,
                            expire_date_alert: None,
                            reference_doc,
                            reason,
                            override_receive_policy: Some(true),
                        },
                        actor,
                    )
                    .await
                    .map(|_| ())
            }
            TypedImportRow::StockIssue {
                barcode,
                warehouse,
                quantity,
                reference_doc,
                reason,
            } => self
                .inventory
                .issue(
                    IssueInput {
                        barcode,
                        warehouse,
                        quantity,
                        reference_doc,
                        reason,
                    },
                    actor,
                )
                .await
                .map(|_| ()),
            TypedImportRow::Adjustment {
                barcode,
                warehouse,
                new_quantity,
                reason,
            } => self
                .inventory
                .adjust(
                    AdjustInput {
                        barcode,
                        warehouse,
                        new_quantity,
                        reason: reason
                            .unwrap_or_else(|| "Bulk import adjustment".to_string()),
                    },
                    actor,
                )
                .await
                .map(|_| ()),
            TypedImportRow::StockOut {
                barcode,
                warehouse,
                quantity,
                reason,
            } => self
                .inventory
                .stock_out(
                    IssueInput {
                        barcode,
                        warehouse,
                        quantity,
                        reference_doc: None,
                        reason,
                    },
                    actor,
                )
                .await
                .map(|_| ()),
            TypedImportRow::StockAlertUpdate {
                barcode,
                warehouse,
                stock_alert_level,
            } => self
                .inventory
                .update_alert_level(&barcode, &warehouse, stock_alert_level)
                .await
                .map(|_| ()),
            TypedImportRow::StockTransfer {
                barcode,
                from_warehouse,
                to_warehouse,
                quantity,
                reference_doc,
            } => self
                .transfer
                .transfer(
                    TransferInput {
                        barcode,
                        from_warehouse,
                        to_warehouse,
                        quantity,
                        reference_doc,
                        reason: None,
                    },
                    actor,
                )
                .await
                .map(|_| ()),
        }
    }

    /// Get an import job with its row errors
    pub async fn get_job(&self, job_id: Uuid) -> AppResult<ImportReport> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, import_type, filename, total_records, successful_records, failed_records,
                   status, processed_by, created_at, completed_at
            FROM import_jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Import job".to_string()))?;

        let errors = sqlx::query_as::<_, (i32, String)>(
            "SELECT row_number, message FROM import_row_errors WHERE job_id = $1 ORDER BY row_number",
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(row_number, message)| ImportRowError {
            row_number: row_number as usize,
            message,
        })
        .collect();

        Ok(ImportReport {
            job: map_job(row)?,
            errors,
        })
    }

    /// List import jobs, newest first
    pub async fn list_jobs(&self, limit: i64) -> AppResult<Vec<ImportJob>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, import_type, filename, total_records, successful_records, failed_records,
                   status, processed_by, created_at, completed_at
            FROM import_jobs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_job).collect()
    }
}
