//! HTTP front end for scanward: bearer-authenticated endpoints to submit
//! nmap scans, poll their status and fetch their results.

pub mod auth;
pub mod handlers;
pub mod infra;
pub mod routes;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use infra::app_state::AppState;

/// Builds the complete application with middleware applied.
pub fn create_app(state: AppState) -> Router {
    routes::create_api_router(state.clone())
        // outermost first: CORS, then request tracing
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
