//! Collection endpoint handler.
//!
//! Accepts one metric payload per request, tagged by `type`
//! (`request` or `system`), and stores it as a raw event for the
//! owning project.

use axum::{body::Bytes, extract::State, Json};
use engine_core::MetricPayload;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::extractors::ProjectContext;
use crate::response::{ApiError, CollectResponse};
use crate::state::AppState;

/// POST /collect - SDK metric collection.
pub async fn collect_handler(
    State(state): State<AppState>,
    project: ProjectContext,
    body: Bytes,
) -> Result<Json<CollectResponse>, ApiError> {
    let payload = MetricPayload::parse(&body).map_err(|e| {
        metrics().events_rejected.inc();
        warn!(project_id = %project.project_id, error = %e, "Rejected metric payload");
        e
    })?;

    let event = payload.into_event(&project.project_id);
    let kind = event.kind();
    let service = event.service_name().to_string();

    state.store.insert_raw(event).await?;
    metrics().events_ingested.inc();

    debug!(
        project_id = %project.project_id,
        service = %service,
        kind = %kind,
        "Collected metric"
    );

    Ok(Json(CollectResponse::ok()))
}
