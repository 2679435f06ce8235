//! Resolution selector.
//!
//! Maps a query range to the aggregate table that keeps the returned point
//! count bounded:
//! - range ≤ 1 hour → minute rows
//! - range ≤ 48 hours → hour rows
//! - longer → day rows

use engine_core::{
    BucketRange, MetricStore, RequestAggregate, Resolution, Result, ServiceKey, SystemAggregate,
    ONE_HOUR_MS,
};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use telemetry::metrics;

/// Widest range served from minute rows.
pub const MINUTE_RANGE_LIMIT_MS: i64 = ONE_HOUR_MS;

/// Widest range served from hour rows.
pub const HOUR_RANGE_LIMIT_MS: i64 = 48 * ONE_HOUR_MS;

/// Pick the resolution for a range of `to - from` milliseconds.
pub fn select_resolution(from: i64, to: i64) -> Resolution {
    let range = to.saturating_sub(from);
    if range <= MINUTE_RANGE_LIMIT_MS {
        Resolution::Minute
    } else if range <= HOUR_RANGE_LIMIT_MS {
        Resolution::Hour
    } else {
        Resolution::Day
    }
}

/// A series read at one resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Series<T> {
    pub resolution: Resolution,
    pub from: i64,
    pub to: i64,
    /// Rows with `from ≤ bucket ≤ to`, ascending by bucket.
    pub points: Vec<T>,
}

/// Parameters for a series read. Callers validate `from ≤ to` beforehand.
#[derive(Debug, Clone)]
pub struct SeriesQuery {
    pub service: ServiceKey,
    pub from: i64,
    pub to: i64,
}

impl SeriesQuery {
    pub fn new(
        project_id: impl Into<String>,
        service_name: impl Into<String>,
        from: i64,
        to: i64,
    ) -> Self {
        Self {
            service: ServiceKey::new(project_id, service_name),
            from,
            to,
        }
    }

    pub fn resolution(&self) -> Resolution {
        select_resolution(self.from, self.to)
    }

    fn range(&self) -> BucketRange {
        BucketRange::inclusive(self.from, self.to)
    }
}

/// Read request rows for one service at the resolution the range calls for.
pub async fn request_series(
    store: &dyn MetricStore,
    query: &SeriesQuery,
) -> Result<Series<RequestAggregate>> {
    let start = Instant::now();
    let resolution = query.resolution();
    let mut points = store
        .request_rows(resolution, query.range(), Some(&query.service))
        .await?;
    points.sort_by_key(|row| row.bucket);

    observe(resolution, points.len(), start);
    Ok(Series {
        resolution,
        from: query.from,
        to: query.to,
        points,
    })
}

/// Read system rows for one service at the resolution the range calls for.
pub async fn system_series(
    store: &dyn MetricStore,
    query: &SeriesQuery,
) -> Result<Series<SystemAggregate>> {
    let start = Instant::now();
    let resolution = query.resolution();
    let mut points = store
        .system_rows(resolution, query.range(), Some(&query.service))
        .await?;
    points.sort_by_key(|row| row.bucket);

    observe(resolution, points.len(), start);
    Ok(Series {
        resolution,
        from: query.from,
        to: query.to,
        points,
    })
}

fn observe(resolution: Resolution, points: usize, start: Instant) {
    metrics().queries_served.inc();
    metrics().query_latency_ms.observe(start.elapsed().as_millis() as u64);
    debug!(resolution = %resolution, points = points, "Served series");
}
