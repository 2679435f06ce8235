//! Debug view of recently received raw events.

use axum::{extract::State, Json};

use crate::response::{ApiError, DebugMetricsResponse};
use crate::state::AppState;

/// Raw events returned per kind.
pub const DEBUG_EVENT_LIMIT: usize = 100;

/// GET /debug/metrics - Most recent raw events of each kind.
pub async fn debug_metrics_handler(
    State(state): State<AppState>,
) -> Result<Json<DebugMetricsResponse>, ApiError> {
    let recent = state.store.recent_raw(DEBUG_EVENT_LIMIT).await?;
    Ok(Json(recent.into()))
}
