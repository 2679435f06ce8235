//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = state.store.ping().await;
    if store_connected {
        health().store.set_healthy();
    } else {
        health().store.set_unhealthy("store ping failed");
    }

    let report = health().report();

    Json(HealthResponse {
        status: report.status.as_str().to_string(),
        store_connected,
        scheduler_healthy: health().scheduler.is_healthy(),
        events_ingested: metrics().events_ingested.get(),
        rows_upserted: metrics().rows_upserted(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
