//! Inventory ledger HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;

use crate::middleware::{check_permission, CurrentUser};
use crate::services::inventory::{AdjustInput, InventoryService, IssueInput, ReceiveInput};
use crate::services::notification::NotificationService;
use crate::services::transfer::{TransferInput, TransferService};
use crate::AppState;

pub(crate) fn inventory_service(state: &AppState) -> InventoryService {
    InventoryService::new(state.db.clone())
        .with_notifier(NotificationService::new(&state.config.email))
        .with_receive_policy(state.config.policy.allow_non_central_receive)
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub warehouse: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPath {
    pub warehouse: String,
    pub barcode: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkResetInput {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AlertLevelInput {
    pub stock_alert_level: rust_decimal::Decimal,
}

/// List inventory records, optionally filtered by warehouse
pub async fn list_records(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<ListRecordsQuery>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.list_records(query.warehouse.as_deref()).await {
        Ok(records) => (
            StatusCode::OK,
            Json(serde_json::json!({ "records": records })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get one inventory record by warehouse and barcode
pub async fn get_record(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(path): Path<RecordPath>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.get_record(&path.barcode, &path.warehouse).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the transaction log for a record
pub async fn get_transactions(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(path): Path<RecordPath>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.get_transactions(&path.barcode, &path.warehouse).await {
        Ok(transactions) => (
            StatusCode::OK,
            Json(serde_json::json!({ "transactions": transactions })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Receive stock into a warehouse
pub async fn receive_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<ReceiveInput>,
) -> impl IntoResponse {
    // Bypassing the central-warehouse receive policy is a privileged action.
    if input.override_receive_policy.unwrap_or(false) {
        if let Err(response) = check_permission(&current_user.0, "inventory", "override_receive") {
            return response;
        }
    }

    let service = inventory_service(&state);

    match service.receive(input, current_user.0.user_id).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Issue stock out of a warehouse
pub async fn issue_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<IssueInput>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.issue(input, current_user.0.user_id).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Remove stock permanently (damage, expiry, loss)
pub async fn stock_out(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<IssueInput>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.stock_out(input, current_user.0.user_id).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Set an absolute quantity for a record
pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<AdjustInput>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service.adjust(input, current_user.0.user_id).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update the low-stock alert threshold for a record
pub async fn update_alert_level(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(path): Path<RecordPath>,
    Json(input): Json<AlertLevelInput>,
) -> impl IntoResponse {
    let service = inventory_service(&state);

    match service
        .update_alert_level(&path.barcode, &path.warehouse, input.stock_alert_level)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Transfer stock between warehouses
pub async fn transfer_stock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<TransferInput>,
) -> impl IntoResponse {
    let service = TransferService::new(state.db.clone())
        .with_notifier(NotificationService::new(&state.config.email));

    match service.transfer(input, current_user.0.user_id).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reset every non-zero balance to zero
pub async fn bulk_reset(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<BulkResetInput>,
) -> impl IntoResponse {
    if let Err(response) = check_permission(&current_user.0, "inventory", "reset") {
        return response;
    }

    let service = inventory_service(&state);

    match service
        .bulk_reset_to_zero(
            current_user.0.user_id,
            &input.reason,
            state.config.bulk.chunk_size,
        )
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
