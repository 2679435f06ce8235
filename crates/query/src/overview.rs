//! Service overview and coarse health status.
//!
//! Built from hour rows only: request rows over the trailing 24 hours and
//! system rows over the trailing hour, both selected by bucket in
//! `[now - window, now]`.

use engine_core::stats::{max, mean, weighted_avg_response_time};
use engine_core::{
    BucketRange, MetricStore, RequestAggregate, Resolution, Result, ServiceKey, SystemAggregate,
    ONE_DAY_MS, ONE_HOUR_MS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Error rate (percent) above which a service is critical.
pub const CRITICAL_ERROR_RATE: f64 = 10.0;
/// Error rate (percent) above which a service is degraded.
pub const DEGRADED_ERROR_RATE: f64 = 5.0;
/// Average response time (ms) above which a service is degraded.
pub const DEGRADED_RESPONSE_TIME_MS: f64 = 700.0;
/// Average CPU (percent) above which a service is degraded.
pub const DEGRADED_CPU_PERCENT: f64 = 85.0;

/// Trailing window for request statistics.
pub const REQUEST_WINDOW_MS: i64 = ONE_DAY_MS;
/// Trailing window for resource statistics.
pub const SYSTEM_WINDOW_MS: i64 = ONE_HOUR_MS;

/// Coarse service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Critical,
}

impl ServiceStatus {
    /// Classify from unrounded error rate, average latency and CPU.
    pub fn classify(error_rate: f64, avg_response_time: f64, avg_cpu: f64) -> Self {
        if error_rate > CRITICAL_ERROR_RATE {
            Self::Critical
        } else if error_rate > DEGRADED_ERROR_RATE
            || avg_response_time > DEGRADED_RESPONSE_TIME_MS
            || avg_cpu > DEGRADED_CPU_PERCENT
        {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived overview of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOverview {
    pub service_name: String,
    pub total_requests: u64,
    pub total_errors: u64,
    /// Percent of requests with a 4xx or 5xx status.
    pub error_rate: f64,
    pub avg_response_time: f64,
    pub p95_response_time: f64,
    pub avg_cpu: f64,
    pub avg_memory_mb: f64,
    pub status: ServiceStatus,
}

impl ServiceOverview {
    /// Derive the overview from already-selected hour rows.
    pub fn from_rows(
        service_name: impl Into<String>,
        request_rows: &[RequestAggregate],
        system_rows: &[SystemAggregate],
    ) -> Self {
        let total_requests: u64 = request_rows.iter().map(|r| r.total_requests).sum();
        let total_errors: u64 = request_rows.iter().map(RequestAggregate::error_count).sum();

        let error_rate = if total_requests > 0 {
            100.0 * total_errors as f64 / total_requests as f64
        } else {
            0.0
        };
        let avg_response_time = weighted_avg_response_time(request_rows);
        let p95_response_time = max(request_rows.iter().map(|r| r.p95_response_time));

        let avg_cpu = mean(system_rows.iter().map(|r| r.avg_cpu));
        let avg_memory_mb = mean(system_rows.iter().map(|r| r.avg_memory_mb));

        Self {
            service_name: service_name.into(),
            total_requests,
            total_errors,
            error_rate,
            avg_response_time,
            p95_response_time,
            avg_cpu,
            avg_memory_mb,
            status: ServiceStatus::classify(error_rate, avg_response_time, avg_cpu),
        }
    }
}

/// Compute the overview for one service as of `now_ms`.
pub async fn service_overview(
    store: &dyn MetricStore,
    service: &ServiceKey,
    now_ms: i64,
) -> Result<ServiceOverview> {
    let request_rows = store
        .request_rows(
            Resolution::Hour,
            BucketRange::inclusive(now_ms - REQUEST_WINDOW_MS, now_ms),
            Some(service),
        )
        .await?;
    let system_rows = store
        .system_rows(
            Resolution::Hour,
            BucketRange::inclusive(now_ms - SYSTEM_WINDOW_MS, now_ms),
            Some(service),
        )
        .await?;

    let overview = ServiceOverview::from_rows(&service.service_name, &request_rows, &system_rows);
    debug!(
        project_id = %service.project_id,
        service = %service.service_name,
        request_rows = request_rows.len(),
        system_rows = system_rows.len(),
        status = %overview.status,
        "Computed service overview"
    );
    Ok(overview)
}
