//! Standardized API responses.
//!
//! Wire types live here so the core keeps native numbers: buckets go out as
//! decimal strings and overview ratios are rounded to two places.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine_core::{RecentRawEvents, RequestAggregate, RequestEvent, SystemAggregate, SystemEvent};
use query::{Series, ServiceOverview, ServiceStatus};
use serde::{Deserialize, Serialize};

/// Success response for collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectResponse {
    pub status: String,
}

impl CollectResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub scheduler_healthy: bool,
    pub events_ingested: u64,
    pub rows_upserted: u64,
}

/// Series response with the resolution that served it.
#[derive(Debug, Serialize)]
pub struct SeriesResponse<T> {
    pub resolution: String,
    pub from: String,
    pub to: String,
    pub points: Vec<T>,
}

impl<S, T: From<S>> From<Series<S>> for SeriesResponse<T> {
    fn from(series: Series<S>) -> Self {
        Self {
            resolution: series.resolution.as_str().to_string(),
            from: series.from.to_string(),
            to: series.to.to_string(),
            points: series.points.into_iter().map(T::from).collect(),
        }
    }
}

/// One request aggregate on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPoint {
    pub bucket: String,
    pub route: String,
    pub method: String,
    pub total_requests: u64,
    pub success_count: u64,
    pub client_error_count: u64,
    pub server_error_count: u64,
    pub avg_response_time: f64,
    pub max_response_time: f64,
    pub p95_response_time: f64,
}

impl From<RequestAggregate> for RequestPoint {
    fn from(row: RequestAggregate) -> Self {
        Self {
            bucket: row.bucket.to_string(),
            route: row.route,
            method: row.method,
            total_requests: row.total_requests,
            success_count: row.success_count,
            client_error_count: row.client_error_count,
            server_error_count: row.server_error_count,
            avg_response_time: row.avg_response_time,
            max_response_time: row.max_response_time,
            p95_response_time: row.p95_response_time,
        }
    }
}

/// One system aggregate on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPoint {
    pub bucket: String,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_memory_mb: f64,
    pub max_memory_mb: f64,
}

impl From<SystemAggregate> for SystemPoint {
    fn from(row: SystemAggregate) -> Self {
        Self {
            bucket: row.bucket.to_string(),
            avg_cpu: row.avg_cpu,
            max_cpu: row.max_cpu,
            avg_memory_mb: row.avg_memory_mb,
            max_memory_mb: row.max_memory_mb,
        }
    }
}

/// Overview window label.
pub const OVERVIEW_TIME_WINDOW: &str = "last_24_hours";

/// Service overview on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub service_name: String,
    pub time_window: String,
    pub total_requests: u64,
    pub error_rate: f64,
    pub avg_response_time: f64,
    pub p95_response_time: f64,
    pub avg_cpu_last_hour: f64,
    pub avg_memory_last_hour: f64,
    pub status: ServiceStatus,
}

impl From<ServiceOverview> for OverviewResponse {
    fn from(overview: ServiceOverview) -> Self {
        Self {
            service_name: overview.service_name,
            time_window: OVERVIEW_TIME_WINDOW.to_string(),
            total_requests: overview.total_requests,
            error_rate: round2(overview.error_rate),
            avg_response_time: round2(overview.avg_response_time),
            p95_response_time: overview.p95_response_time,
            avg_cpu_last_hour: round2(overview.avg_cpu),
            avg_memory_last_hour: round2(overview.avg_memory_mb),
            status: overview.status,
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recent raw events of one kind.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecentEvents<T> {
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> From<Vec<T>> for RecentEvents<T> {
    fn from(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

/// Debug view of the raw store.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugMetricsResponse {
    pub request_metrics: RecentEvents<RequestEvent>,
    pub system_metrics: RecentEvents<SystemEvent>,
    pub total: usize,
}

impl From<RecentRawEvents> for DebugMetricsResponse {
    fn from(recent: RecentRawEvents) -> Self {
        let total = recent.request_metrics.len() + recent.system_metrics.len();
        Self {
            request_metrics: recent.request_metrics.into(),
            system_metrics: recent.system_metrics.into(),
            total,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with coded responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<engine_core::Error> for ApiError {
    fn from(err: engine_core::Error) -> Self {
        match &err {
            engine_core::Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            engine_core::Error::Database { code, message, http_status } => {
                let status = StatusCode::from_u16(*http_status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                ApiError::with_code(status, *code, message)
            }
            engine_core::Error::Validation(msg) => ApiError::bad_request(msg),
            engine_core::Error::Serialization(_)
            | engine_core::Error::InvalidMetricType(_)
            | engine_core::Error::MissingField(_) => ApiError::validation(
                err.error_code().unwrap_or("VALID_001"),
                vec![err.to_string()],
            ),
            engine_core::Error::Internal(_) => ApiError::internal(err.to_string()),
        }
    }
}
