//! Warehouse registry service
//!
//! Canonical list of warehouses. At most one warehouse is flagged central at
//! any time; reassignment is an atomic swap inside one transaction.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::Warehouse;
use shared::validation::validate_warehouse_code;

use crate::error::{AppError, AppResult};

/// Warehouse registry service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub code: String,
    pub is_central: Option<bool>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub notes_th: Option<String>,
}

/// Input for updating a warehouse
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub notes_th: Option<String>,
}

type WarehouseRow = (
    Uuid,
    String,
    String,
    bool,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn map_row(r: WarehouseRow) -> Warehouse {
    Warehouse {
        id: r.0,
        name: r.1,
        code: r.2,
        is_central: r.3,
        is_active: r.4,
        address: r.5,
        notes: r.6,
        notes_th: r.7,
        created_at: r.8,
        updated_at: r.9,
    }
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse; name and code must be unique
    pub async fn create(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Warehouse name cannot be empty".to_string(),
                message_th: "ชื่อคลังสินค้าไม่สามารถว่างได้".to_string(),
            });
        }

        if let Err(msg) = validate_warehouse_code(&input.code) {
            return Err(AppError::Validation {
                field: "code".to_string(),
                message: msg.to_string(),
                message_th: "รหัสคลังสินค้าไม่ถูกต้อง".to_string(),
            });
        }

        let name_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE name = $1)",
        )
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        if name_taken {
            return Err(AppError::DuplicateEntry("warehouse name".to_string()));
        }

        let code_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE code = $1)",
        )
        .bind(&input.code)
        .fetch_one(&self.db)
        .await?;

        if code_taken {
            return Err(AppError::DuplicateEntry("warehouse code".to_string()));
        }

        let is_central = input.is_central.unwrap_or(false);

        let mut tx = self.db.begin().await?;

        // Central flag is exclusive: creating a central warehouse demotes the
        // previous one in the same transaction.
        if is_central {
            sqlx::query("UPDATE warehouses SET is_central = false WHERE is_central = true")
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            INSERT INTO warehouses (name, code, is_central, address, notes, notes_th)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, code, is_central, is_active, address, notes, notes_th,
                      created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.code)
        .bind(is_central)
        .bind(&input.address)
        .bind(&input.notes)
        .bind(&input.notes_th)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(map_row(row))
    }

    /// Atomically move the central flag to the given warehouse
    pub async fn set_central(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE warehouses SET is_central = false WHERE is_central = true AND id <> $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            UPDATE warehouses
            SET is_central = true, updated_at = NOW()
            WHERE id = $1 AND is_active = true
            RETURNING id, name, code, is_central, is_active, address, notes, notes_th,
                      created_at, updated_at
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        tx.commit().await?;

        Ok(map_row(row))
    }

    /// Get a warehouse by id
    pub async fn get(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            SELECT id, name, code, is_central, is_active, address, notes, notes_th,
                   created_at, updated_at
            FROM warehouses
            WHERE id = $1
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(map_row(row))
    }

    /// Get a warehouse by its unique name
    pub async fn get_by_name(&self, name: &str) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            SELECT id, name, code, is_central, is_active, address, notes, notes_th,
                   created_at, updated_at
            FROM warehouses
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(map_row(row))
    }

    /// List warehouses, optionally including deactivated ones
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(
            r#"
            SELECT id, name, code, is_central, is_active, address, notes, notes_th,
                   created_at, updated_at
            FROM warehouses
            WHERE is_active = true OR $1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(map_row).collect())
    }

    /// Update descriptive fields of a warehouse
    pub async fn update(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        let existing = self.get(warehouse_id).await?;

        if let Some(ref name) = input.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation {
                    field: "name".to_string(),
                    message: "Warehouse name cannot be empty".to_string(),
                    message_th: "ชื่อคลังสินค้าไม่สามารถว่างได้".to_string(),
                });
            }
            if *name != existing.name {
                let name_taken = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM warehouses WHERE name = $1 AND id <> $2)",
                )
                .bind(name)
                .bind(warehouse_id)
                .fetch_one(&self.db)
                .await?;
                if name_taken {
                    return Err(AppError::DuplicateEntry("warehouse name".to_string()));
                }
            }
        }

        let name = input.name.unwrap_or(existing.name);
        let address = input.address.or(existing.address);
        let notes = input.notes.or(existing.notes);
        let notes_th = input.notes_th.or(existing.notes_th);

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            UPDATE warehouses
            SET name = $1, address = $2, notes = $3, notes_th = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, code, is_central, is_active, address, notes, notes_th,
                      created_at, updated_at
            "#,
        )
        .bind(&name)
        .bind(&address)
        .bind(&notes)
        .bind(&notes_th)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(map_row(row))
    }

    /// Soft-deactivate a warehouse; a central warehouse loses the flag
    pub async fn deactivate(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            UPDATE warehouses
            SET is_active = false, is_central = false, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, code, is_central, is_active, address, notes, notes_th,
                      created_at, updated_at
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(map_row(row))
    }
}
