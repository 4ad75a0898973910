//! HTTP API route definitions.

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::{routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;

use super::cors::{cors_gate, CorsPolicy};
use super::handlers::{
    health, history, metrics_text, recent, run_by_id, status, trigger, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let origins = state.config.allowed_origins.clone();

    // Read-only dashboard endpoints
    let reads = Router::new()
        .route("/status", get(status))
        .route("/history", get(history))
        .route("/run/:id", get(run_by_id))
        .route("/recent", get(recent))
        .layer(from_fn_with_state(
            CorsPolicy::new(origins.clone(), &[Method::GET]),
            cors_gate,
        ));

    // Dispatch endpoint
    let dispatch = Router::new().route("/trigger", post(trigger)).layer(
        from_fn_with_state(CorsPolicy::new(origins, &[Method::POST]), cors_gate),
    );

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .merge(reads)
        .merge(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
