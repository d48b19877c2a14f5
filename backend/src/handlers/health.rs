//! Service health endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Report service health, including a round trip to the database
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if sqlx::query("SELECT 1").execute(&state.db).await.is_ok() {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "ok",
        service: "warehouse-stock-management",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
