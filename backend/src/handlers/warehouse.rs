//! Warehouse management HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::warehouse::{CreateWarehouseInput, UpdateWarehouseInput, WarehouseService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListWarehousesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<ListWarehousesQuery>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.list(query.include_inactive).await {
        Ok(warehouses) => (
            StatusCode::OK,
            Json(serde_json::json!({ "warehouses": warehouses })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Json(input): Json<CreateWarehouseInput>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.create(input).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a specific warehouse
pub async fn get_warehouse(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.get(warehouse_id).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a warehouse's descriptive fields
pub async fn update_warehouse(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.update(warehouse_id, input).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move the central flag to this warehouse
pub async fn set_central_warehouse(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(response) = check_permission(&current_user.0, "warehouses", "set_central") {
        return response;
    }

    let service = WarehouseService::new(state.db.clone());

    match service.set_central(warehouse_id).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Deactivate a warehouse
pub async fn deactivate_warehouse(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.deactivate(warehouse_id).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}
