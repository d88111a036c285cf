//! Route definitions for the pharmacy inventory server

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (token endpoint public, the rest protected)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - branch management
        .nest("/branches", branch_routes(state.clone()))
        // Protected routes - product catalog
        .nest("/products", product_routes(state.clone()))
        // Protected routes - branch stock and batches
        .nest("/branch-products", branch_product_routes(state.clone()))
        // Protected routes - inventory reconciliation
        .nest("/inventory-reports", inventory_report_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users", post(handlers::create_user))
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/token", post(handlers::login))
        .merge(protected)
}

/// Branch routes (protected)
fn branch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_branches).post(handlers::create_branch))
        .route(
            "/:branch_id",
            get(handlers::get_branch).put(handlers::update_branch),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/price-history", get(handlers::get_price_history))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Branch stock routes (protected)
fn branch_product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_branch_products))
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/low-stock/evaluate", post(handlers::evaluate_low_stock))
        .route("/expiring", get(handlers::list_expiring))
        .route(
            "/:branch_id/:product_id",
            put(handlers::update_branch_product).delete(handlers::delete_branch_product),
        )
        .route(
            "/:branch_id/:product_id/batches",
            get(handlers::list_batches).post(handlers::add_batch),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory report routes (protected)
fn inventory_report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_reports).post(handlers::create_report))
        .route("/branch/:branch_id", get(handlers::list_branch_reports))
        .route("/:report_id", get(handlers::get_report))
        .route("/:report_id/view", put(handlers::mark_viewed))
        .route("/:report_id/export", get(handlers::export_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
