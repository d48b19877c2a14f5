//! Route definitions for the Warehouse Stock Management Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - warehouse registry
        .nest("/warehouses", warehouse_routes())
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
        // Protected routes - batch tracking
        .nest("/batches", batch_routes())
        // Protected routes - bulk imports
        .nest("/imports", import_routes())
        // Protected routes - alerts
        .nest("/alerts", alert_routes())
}

/// Warehouse registry routes (protected)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::deactivate_warehouse),
        )
        .route("/:warehouse_id/central", post(handlers::set_central_warehouse))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Records
        .route("/records", get(handlers::list_records))
        .route("/records/:warehouse/:barcode", get(handlers::get_record))
        .route(
            "/records/:warehouse/:barcode/transactions",
            get(handlers::get_transactions),
        )
        .route(
            "/records/:warehouse/:barcode/alert-level",
            put(handlers::update_alert_level),
        )
        // Ledger operations
        .route("/receive", post(handlers::receive_stock))
        .route("/issue", post(handlers::issue_stock))
        .route("/stock-out", post(handlers::stock_out))
        .route("/adjust", post(handlers::adjust_stock))
        .route("/transfer", post(handlers::transfer_stock))
        .route("/reset", post(handlers::bulk_reset))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Batch tracking routes (protected)
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::create_batch))
        .route("/transfer", post(handlers::transfer_batch))
        .route(
            "/deactivate-expired",
            post(handlers::deactivate_expired_batches),
        )
        .route("/:batch_number", get(handlers::get_batch))
        .route(
            "/:batch_number/transactions",
            get(handlers::get_batch_transactions).post(handlers::record_batch_transaction),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Bulk import routes (protected)
fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_import_jobs).post(handlers::run_import))
        .route("/:job_id", get(handlers::get_import_job))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Alert routes (protected)
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/active", get(handlers::get_active_alerts))
        .route("/logs", get(handlers::list_alert_logs))
        .route("/logs/:alert_id/acknowledge", post(handlers::acknowledge_alert))
        .route("/batches", get(handlers::list_batch_alerts))
        .route(
            "/batches/:alert_id/acknowledge",
            post(handlers::acknowledge_batch_alert),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
