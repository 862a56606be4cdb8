//! Route definitions for the Retail POS Back Office API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Inventory ledger
        .nest("/inventory", inventory_routes())
        // Goods receipt finalization
        .nest("/receipts", receipt_routes())
        // Valuation / stock health reports
        .nest("/reports", report_routes())
}

/// Inventory ledger routes: batches, allocation, adjustments, movements
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products/:product_id/batches",
            get(handlers::list_product_batches),
        )
        .route("/allocations", post(handlers::allocate))
        .route("/allocations/commit", post(handlers::commit_allocation))
        .route("/allocations/execute", post(handlers::execute_allocation))
        .route("/adjustments", post(handlers::create_adjustment))
        .route("/movements", get(handlers::list_movements))
}

/// Goods receipt routes
fn receipt_routes() -> Router<AppState> {
    Router::new().route("/:receipt_id/finalize", post(handlers::finalize_receipt))
}

/// Reporting routes (read-only)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::low_stock))
        .route("/expiring", get(handlers::expiring_batches))
        .route("/valuation", get(handlers::valuation))
}
