use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    auth::{self, auth_middleware},
    handlers::{health::health_handler, scan},
    infra::app_state::AppState,
};

/// Create the API router: public health and auth endpoints plus the
/// bearer-protected scan endpoints.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/login", post(auth::handlers::login))
        .route("/auth/refresh", post(auth::handlers::refresh))
        .merge(create_scan_routes(state))
}

fn create_scan_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan::submit_scan).get(scan::list_scans))
        .route("/scan/{job_id}", get(scan::get_scan))
        .route("/scan/{job_id}/result", get(scan::get_scan_result))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
