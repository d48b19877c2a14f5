//! Alert HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::alert::AlertService;
use crate::AppState;

fn alert_service(state: &AppState) -> AlertService {
    AlertService::new(state.db.clone(), state.config.alerts.batch_expiry_window_days)
}

#[derive(Debug, Deserialize)]
pub struct ActiveAlertsQuery {
    pub warehouse: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertLogQuery {
    #[serde(default)]
    pub unacknowledged_only: bool,
}

/// Compute the current set of live alerts
pub async fn get_active_alerts(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<ActiveAlertsQuery>,
) -> impl IntoResponse {
    let service = alert_service(&state);

    match service.query_active_alerts(query.warehouse.as_deref()).await {
        Ok(alerts) => (
            StatusCode::OK,
            Json(serde_json::json!({ "alerts": alerts })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// List persisted stock alert events
pub async fn list_alert_logs(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<AlertLogQuery>,
) -> impl IntoResponse {
    let service = alert_service(&state);

    match service.list_alert_logs(query.unacknowledged_only).await {
        Ok(alerts) => (
            StatusCode::OK,
            Json(serde_json::json!({ "alerts": alerts })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Acknowledge a stock alert event
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(alert_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = alert_service(&state);

    match service
        .acknowledge_alert_log(alert_id, current_user.0.user_id)
        .await
    {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List persisted batch alert events
pub async fn list_batch_alerts(
    State(state): State<AppState>,
    Extension(_current_user): Extension<CurrentUser>,
    Query(query): Query<AlertLogQuery>,
) -> impl IntoResponse {
    let service = alert_service(&state);

    match service.list_batch_alerts(query.unacknowledged_only).await {
        Ok(alerts) => (
            StatusCode::OK,
            Json(serde_json::json!({ "alerts": alerts })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Acknowledge a batch alert event
pub async fn acknowledge_batch_alert(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(alert_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = alert_service(&state);

    match service
        .acknowledge_batch_alert(alert_id, current_user.0.user_id)
        .await
    {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => e.into_response(),
    }
}
