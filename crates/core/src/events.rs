//! Raw metric event definitions.
//!
//! Raw events are produced by the ingestion surface after validation and are
//! immutable from then on. Timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric family an event or aggregate row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Request,
    System,
}

impl MetricKind {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::System => "system",
        }
    }

    pub const ALL: [MetricKind; 2] = [MetricKind::Request, MetricKind::System];
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP request outcome observed by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    pub project_id: String,
    pub service_name: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub latency_ms: f64,
    pub is_error: bool,
}

impl RequestEvent {
    /// Builds a request event, deriving `is_error` from the status code.
    pub fn new(
        project_id: impl Into<String>,
        service_name: impl Into<String>,
        timestamp: i64,
        method: impl Into<String>,
        route: impl Into<String>,
        status_code: u16,
        latency_ms: f64,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            service_name: service_name.into(),
            timestamp,
            method: method.into(),
            route: route.into(),
            status_code,
            latency_ms,
            is_error: status_code >= 500,
        }
    }
}

/// One host resource sample reported by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEvent {
    pub project_id: String,
    pub service_name: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
}

impl SystemEvent {
    pub fn new(
        project_id: impl Into<String>,
        service_name: impl Into<String>,
        timestamp: i64,
        cpu_usage_percent: f64,
        memory_usage_mb: f64,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            service_name: service_name.into(),
            timestamp,
            cpu_usage_percent,
            memory_usage_mb,
        }
    }
}

/// A validated raw metric event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawMetricEvent {
    Request(RequestEvent),
    System(SystemEvent),
}

impl RawMetricEvent {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Request(_) => MetricKind::Request,
            Self::System(_) => MetricKind::System,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Request(e) => e.timestamp,
            Self::System(e) => e.timestamp,
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            Self::Request(e) => &e.project_id,
            Self::System(e) => &e.project_id,
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            Self::Request(e) => &e.service_name,
            Self::System(e) => &e.service_name,
        }
    }
}

impl From<RequestEvent> for RawMetricEvent {
    fn from(event: RequestEvent) -> Self {
        Self::Request(event)
    }
}

impl From<SystemEvent> for RawMetricEvent {
    fn from(event: SystemEvent) -> Self {
        Self::System(event)
    }
}
