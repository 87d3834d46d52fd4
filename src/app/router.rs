use axum::Router;
use axum::routing::get;
use tracing::debug;

use crate::otlp::{OTLPState, otlp_routes};

/// Build the HTTP router: health check plus the three OTLP endpoints.
pub fn main_router(otlp_state: OTLPState) -> Router {
    Router::new()
        .route("/v1/health", get(health_handler))
        .merge(otlp_routes(otlp_state))
}

/// Handler for GET /v1/health
async fn health_handler() -> &'static str {
    debug!("Health check requested");
    "Healthy"
}
