//! Series endpoints backed by the resolution selector.

use axum::{extract::State, Json};
use query::{request_series, system_series};

use crate::extractors::SeriesParams;
use crate::response::{ApiError, RequestPoint, SeriesResponse, SystemPoint};
use crate::state::AppState;

/// GET /metrics/request - Request aggregates for one service.
pub async fn request_metrics_handler(
    State(state): State<AppState>,
    SeriesParams(query): SeriesParams,
) -> Result<Json<SeriesResponse<RequestPoint>>, ApiError> {
    let series = request_series(state.store.as_ref(), &query).await?;
    Ok(Json(series.into()))
}

/// GET /metrics/system - Resource aggregates for one service.
pub async fn system_metrics_handler(
    State(state): State<AppState>,
    SeriesParams(query): SeriesParams,
) -> Result<Json<SeriesResponse<SystemPoint>>, ApiError> {
    let series = system_series(state.store.as_ref(), &query).await?;
    Ok(Json(series.into()))
}
