//! API routes.

pub mod collect;
pub mod debug;
pub mod health;
pub mod metrics;
pub mod overview;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/collect", post(collect::collect_handler))
        .route("/metrics/request", get(metrics::request_metrics_handler))
        .route("/metrics/system", get(metrics::system_metrics_handler))
        .route("/overview", get(overview::overview_handler))
        .route("/debug/metrics", get(debug::debug_metrics_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
