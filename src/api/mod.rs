//! HTTP API: dashboard endpoints, health and metrics.

pub mod cors;
pub mod handlers;
pub mod routes;

pub use cors::{cors_gate, CorsPolicy};
pub use handlers::AppState;
pub use routes::create_router;
