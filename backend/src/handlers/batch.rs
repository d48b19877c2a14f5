//! Batch tracking HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::batch::{
    BatchService, BatchTransactionInput, BatchTransferInput, CreateBatchInput,
};
use crate::AppState;

fn batch_service(state: &AppState) -> BatchService {
    BatchService::new(state.db.clone(), state.config.alerts.batch_expiry_window_days)
}

#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub inventory_id: Uuid,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a new batch
pub async fn create_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<CreateBatchInput>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service.create_batch(input, current_user.0.user_id).await {
        Ok(batch) => (StatusCode::CREATED, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List batches for an inventory record
pub async fn list_batches(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<ListBatchesQuery>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service
        .list_batches(query.inventory_id, query.include_inactive)
        .await
    {
        Ok(batches) => (
            StatusCode::OK,
            Json(serde_json::json!({ "batches": batches })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a batch by its number
pub async fn get_batch(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(batch_number): Path<String>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service.get_batch(&batch_number).await {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a quantity change against a batch
pub async fn record_batch_transaction(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(batch_number): Path<String>,
    Json(input): Json<BatchTransactionInput>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service
        .record_transaction(&batch_number, input, current_user.0.user_id)
        .await
    {
        Ok(batch) => (StatusCode::CREATED, Json(batch)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the transaction log for a batch
pub async fn get_batch_transactions(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(batch_number): Path<String>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service.get_batch_transactions(&batch_number).await {
        Ok(transactions) => (
            StatusCode::OK,
            Json(serde_json::json!({ "transactions": transactions })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move part of a batch to another warehouse
pub async fn transfer_batch(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<BatchTransferInput>,
) -> impl IntoResponse {
    let service = batch_service(&state);

    match service.transfer_batch(input, current_user.0.user_id).await {
        Ok((source, destination)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "source": source, "destination": destination })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeactivateExpiredQuery {
    /// Reference date for the expiry comparison; defaults to today
    pub as_of: Option<NaiveDate>,
}

/// Deactivate all batches expired as of the given date (default: today)
pub async fn deactivate_expired_batches(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<DeactivateExpiredQuery>,
) -> impl IntoResponse {
    let service = batch_service(&state);
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());

    match service
        .deactivate_expired(as_of, state.config.bulk.chunk_size)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}
