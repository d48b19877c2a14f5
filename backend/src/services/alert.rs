//! Alert evaluation service
//!
//! Live alerts are derived fresh from ledger state on every query and never
//! persisted, so they disappear as soon as the underlying condition clears.
//! The persisted alert logs are written by the mutation paths; this service
//! only reads and acknowledges them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    expiring_stock_priority, low_stock_priority, ActiveAlert, AlertLog, AlertPriority, AlertType,
    BatchAlert,
};

use crate::error::{AppError, AppResult};

/// Alert evaluation service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    batch_expiry_window_days: i64,
}

fn priority_rank(p: AlertPriority) -> u8 {
    match p {
        AlertPriority::High => 0,
        AlertPriority::Medium => 1,
        AlertPriority::Low => 2,
    }
}

type AlertLogRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Uuid,
    bool,
    Option<Uuid>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

fn map_alert_log(r: AlertLogRow) -> AppResult<AlertLog> {
    let alert_type = AlertType::from_str(&r.1)
        .ok_or_else(|| AppError::Internal(format!("Unknown alert type '{}'", r.1)))?;
    let priority = AlertPriority::from_str(&r.2)
        .ok_or_else(|| AppError::Internal(format!("Unknown alert priority '{}'", r.2)))?;
    Ok(AlertLog {
        id: r.0,
        alert_type,
        priority,
        message: r.3,
        message_th: r.4,
        inventory_id: r.5,
        acknowledged: r.6,
        acknowledged_by: r.7,
        acknowledged_at: r.8,
        created_at: r.9,
    })
}

fn map_batch_alert(r: AlertLogRow) -> AppResult<BatchAlert> {
    let alert_type = AlertType::from_str(&r.1)
        .ok_or_else(|| AppError::Internal(format!("Unknown alert type '{}'", r.1)))?;
    let priority = AlertPriority::from_str(&r.2)
        .ok_or_else(|| AppError::Internal(format!("Unknown alert priority '{}'", r.2)))?;
    Ok(BatchAlert {
        id: r.0,
        alert_type,
        priority,
        message: r.3,
        message_th: r.4,
        batch_id: r.5,
        acknowledged: r.6,
        acknowledged_by: r.7,
        acknowledged_at: r.8,
        created_at: r.9,
    })
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool, batch_expiry_window_days: i64) -> Self {
        Self {
            db,
            batch_expiry_window_days,
        }
    }

    /// Compute the current set of live alerts across all warehouses.
    ///
    /// A negative balance reports as `negative_stock` only; records at or
    /// below their threshold but not negative report as `low_stock`. Item and
    /// batch expiry alerts use days-until-expiry against their respective
    /// windows. Sorted by priority, then soonest expiry.
    pub async fn query_active_alerts(
        &self,
        warehouse: Option<&str>,
    ) -> AppResult<Vec<ActiveAlert>> {
        let today = Utc::now().date_naive();
        let mut alerts: Vec<ActiveAlert> = Vec::new();

        self.collect_stock_alerts(warehouse, &mut alerts).await?;
        self.collect_item_expiry_alerts(warehouse, today, &mut alerts)
            .await?;
        self.collect_batch_expiry_alerts(warehouse, today, &mut alerts)
            .await?;

        alerts.sort_by(|a, b| {
            priority_rank(a.priority)
                .cmp(&priority_rank(b.priority))
                .then(
                    a.days_until_expiry
                        .unwrap_or(i64::MAX)
                        .cmp(&b.days_until_expiry.unwrap_or(i64::MAX)),
                )
        });

        Ok(alerts)
    }

    async fn collect_stock_alerts(
        &self,
        warehouse: Option<&str>,
        alerts: &mut Vec<ActiveAlert>,
    ) -> AppResult<()> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, Decimal, Decimal)>(
            r#"
            SELECT id, barcode, warehouse_name, item_name, stock_qty, stock_alert_level
            FROM inventory_records
            WHERE ($1::TEXT IS NULL OR warehouse_name = $1)
              AND (stock_qty < 0 OR (stock_alert_level > 0 AND stock_qty <= stock_alert_level))
            "#,
        )
        .bind(warehouse)
        .fetch_all(&self.db)
        .await?;

        for (id, barcode, warehouse_name, item_name, qty, level) in rows {
            if qty < Decimal::ZERO {
                alerts.push(ActiveAlert {
                    alert_type: AlertType::NegativeStock,
                    priority: AlertPriority::High,
                    barcode,
                    warehouse_name: warehouse_name.clone(),
                    item_name: item_name.clone(),
                    inventory_id: Some(id),
                    batch_id: None,
                    batch_number: None,
                    stock_qty: Some(qty),
                    stock_alert_level: Some(level),
                    days_until_expiry: None,
                    message: format!(
                        "Stock for {} at {} is negative ({})",
                        item_name, warehouse_name, qty
                    ),
                    message_th: format!(
                        "สต็อกของ {} ที่คลัง {} ติดลบ ({})",
                        item_name, warehouse_name, qty
                    ),
                });
            } else if let Some(priority) = low_stock_priority(qty, level) {
                alerts.push(ActiveAlert {
                    alert_type: AlertType::LowStock,
                    priority,
                    barcode,
                    warehouse_name: warehouse_name.clone(),
                    item_name: item_name.clone(),
                    inventory_id: Some(id),
                    batch_id: None,
                    batch_number: None,
                    stock_qty: Some(qty),
                    stock_alert_level: Some(level),
                    days_until_expiry: None,
                    message: format!(
                        "Stock for {} at {} is {} (alert level {})",
                        item_name, warehouse_name, qty, level
                    ),
                    message_th: format!(
                        "สต็อกของ {} ที่คลัง {} เหลือ {} (เกณฑ์แจ้งเตือน {})",
                        item_name, warehouse_name, qty, level
                    ),
                });
            }
        }

        Ok(())
    }

    async fn collect_item_expiry_alerts(
        &self,
        warehouse: Option<&str>,
        today: NaiveDate,
        alerts: &mut Vec<ActiveAlert>,
    ) -> AppResult<()> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, NaiveDate, i32)>(
            r#"
            SELECT id, barcode, warehouse_name, item_name, expire_date, expire_date_alert
            FROM inventory_records
            WHERE ($1::TEXT IS NULL OR warehouse_name = $1)
              AND expire_date IS NOT NULL
              AND expire_date_alert > 0
              AND expire_date <= $2 + expire_date_alert
            "#,
        )
        .bind(warehouse)
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        for (id, barcode, warehouse_name, item_name, expire_date, _) in rows {
            let days = (expire_date - today).num_days();
            alerts.push(ActiveAlert {
                alert_type: AlertType::Expiring,
                priority: expiring_stock_priority(days),
                barcode,
                warehouse_name: warehouse_name.clone(),
                item_name: item_name.clone(),
                inventory_id: Some(id),
                batch_id: None,
                batch_number: None,
                stock_qty: None,
                stock_alert_level: None,
                days_until_expiry: Some(days),
                message: if days < 0 {
                    format!("{} at {} is expired", item_name, warehouse_name)
                } else {
                    format!(
                        "{} at {} expires in {} days",
                        item_name, warehouse_name, days
                    )
                },
                message_th: if days < 0 {
                    format!("{} ที่คลัง {} หมดอายุแล้ว", item_name, warehouse_name)
                } else {
                    format!(
                        "{} ที่คลัง {} จะหมดอายุในอีก {} วัน",
                        item_name, warehouse_name, days
                    )
                },
            });
        }

        Ok(())
    }

    async fn collect_batch_expiry_alerts(
        &self,
        warehouse: Option<&str>,
        today: NaiveDate,
        alerts: &mut Vec<ActiveAlert>,
    ) -> AppResult<()> {
        let rows = sqlx::query_as::<_, (Uuid, String, NaiveDate, Uuid, String, String, String)>(
            r#"
            SELECT b.id, b.batch_number, b.expiry_date, r.id, r.barcode, r.warehouse_name,
                   r.item_name
            FROM batches b
            JOIN inventory_records r ON r.id = b.inventory_id
            WHERE ($1::TEXT IS NULL OR r.warehouse_name = $1)
              AND b.is_active = true
              AND b.quantity_remaining > 0
              AND b.expiry_date <= $2 + $3::INT
            "#,
        )
        .bind(warehouse)
        .bind(today)
        .bind(self.batch_expiry_window_days as i32)
        .fetch_all(&self.db)
        .await?;

        for (batch_id, batch_number, expiry_date, inventory_id, barcode, warehouse_name, item_name) in
            rows
        {
            let days = (expiry_date - today).num_days();
            alerts.push(ActiveAlert {
                alert_type: AlertType::BatchExpiring,
                priority: expiring_stock_priority(days),
                barcode,
                warehouse_name: warehouse_name.clone(),
                item_name,
                inventory_id: Some(inventory_id),
                batch_id: Some(batch_id),
                batch_number: Some(batch_number.clone()),
                stock_qty: None,
                stock_alert_level: None,
                days_until_expiry: Some(days),
                message: if days < 0 {
                    format!("Batch {} at {} is expired", batch_number, warehouse_name)
                } else {
                    format!(
                        "Batch {} at {} expires in {} days",
                        batch_number, warehouse_name, days
                    )
                },
                message_th: if days < 0 {
                    format!("ล็อต {} ที่คลัง {} หมดอายุแล้ว", batch_number, warehouse_name)
                } else {
                    format!(
                        "ล็อต {} ที่คลัง {} จะหมดอายุในอีก {} วัน",
                        batch_number, warehouse_name, days
                    )
                },
            });
        }

        Ok(())
    }

    /// List persisted stock alert events, optionally only unacknowledged
    pub async fn list_alert_logs(&self, unacknowledged_only: bool) -> AppResult<Vec<AlertLog>> {
        let rows = sqlx::query_as::<_, AlertLogRow>(
            r#"
            SELECT id, alert_type, priority, message, message_th, inventory_id,
                   acknowledged, acknowledged_by, acknowledged_at, created_at
            FROM alert_logs
            WHERE acknowledged = false OR NOT $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(unacknowledged_only)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_alert_log).collect()
    }

    /// Acknowledge a stock alert event; idempotent on re-acknowledge
    pub async fn acknowledge_alert_log(&self, alert_id: Uuid, actor: Uuid) -> AppResult<AlertLog> {
        let row = sqlx::query_as::<_, AlertLogRow>(
            r#"
            UPDATE alert_logs
            SET acknowledged = true,
                acknowledged_by = COALESCE(acknowledged_by, $1),
                acknowledged_at = COALESCE(acknowledged_at, NOW())
            WHERE id = $2
            RETURNING id, alert_type, priority, message, message_th, inventory_id,
                      acknowledged, acknowledged_by, acknowledged_at, created_at
            "#,
        )
        .bind(actor)
        .bind(alert_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        map_alert_log(row)
    }

    /// List persisted batch alert events, optionally only unacknowledged
    pub async fn list_batch_alerts(&self, unacknowledged_only: bool) -> AppResult<Vec<BatchAlert>> {
        let rows = sqlx::query_as::<_, AlertLogRow>(
            r#"
            SELECT id, alert_type, priority, message, message_th, batch_id,
                   acknowledged, acknowledged_by, acknowledged_at, created_at
            FROM batch_alerts
            WHERE acknowledged = false OR NOT $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(unacknowledged_only)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_batch_alert).collect()
    }

    /// Acknowledge a batch alert event; idempotent on re-acknowledge
    pub async fn acknowledge_batch_alert(
        &self,
        alert_id: Uuid,
        actor: Uuid,
    ) -> AppResult<BatchAlert> {
        let row = sqlx::query_as::<_, AlertLogRow>(
            r#"
            UPDATE batch_alerts
            SET acknowledged = true,
                acknowledged_by = COALESCE(acknowledged_by, $1),
                acknowledged_at = COALESCE(acknowledged_at, NOW())
            WHERE id = $2
            RETURNING id, alert_type, priority, message, message_th, batch_id,
                      acknowledged, acknowledged_by, acknowledged_at, created_at
            "#,
        )
        .bind(actor)
        .bind(alert_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch alert".to_string()))?;

        map_batch_alert(row)
    }
}
