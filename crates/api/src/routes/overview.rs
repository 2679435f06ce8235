//! Service overview endpoint.

use axum::{extract::State, Json};
use query::service_overview;

use crate::extractors::ServiceParams;
use crate::response::{ApiError, OverviewResponse};
use crate::state::AppState;

/// GET /overview - Last-24-hours summary and health status for one service.
pub async fn overview_handler(
    State(state): State<AppState>,
    ServiceParams(service): ServiceParams,
) -> Result<Json<OverviewResponse>, ApiError> {
    let overview = service_overview(state.store.as_ref(), &service, state.now_ms()).await?;
    Ok(Json(overview.into()))
}
