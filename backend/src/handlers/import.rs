//! Bulk import HTTP handlers

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::ImportType;

use crate::error::AppError;
use crate::handlers::inventory::inventory_service;
use crate::middleware::CurrentUser;
use crate::services::import::ImportService;
use crate::services::transfer::TransferService;
use crate::AppState;

fn import_service(state: &AppState) -> ImportService {
    ImportService::new(
        state.db.clone(),
        inventory_service(state),
        TransferService::new(state.db.clone()),
    )
}

#[derive(Debug, Deserialize)]
pub struct RunImportInput {
    pub import_type: String,
    pub filename: String,
    pub rows: Vec<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
}

/// Run a bulk import over parsed rows
pub async fn run_import(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(input): Json<RunImportInput>,
) -> impl IntoResponse {
    let import_type = match ImportType::from_str(&input.import_type) {
        Some(t) => t,
        None => {
            return AppError::ValidationError(format!(
                "Unknown import type '{}'",
                input.import_type
            ))
            .into_response()
        }
    };

    let service = import_service(&state);

    match service
        .run_import(
            import_type,
            &input.filename,
            &input.rows,
            current_user.0.user_id,
        )
        .await
    {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List import jobs, newest first
pub async fn list_import_jobs(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let service = import_service(&state);

    match service.list_jobs(query.limit.unwrap_or(50)).await {
        Ok(jobs) => (StatusCode::OK, Json(serde_json::json!({ "jobs": jobs }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get an import job with its row errors
pub async fn get_import_job(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = import_service(&state);

    match service.get_job(job_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
