//! Metric payloads as sent by service SDKs.
//!
//! The SDK does not know its project; the ingestion surface supplies the
//! project identifier and turns a payload into a [`RawMetricEvent`].
//! Payloads are a tagged union on `type`; unknown tags are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::{RawMetricEvent, RequestEvent, SystemEvent};

/// Request outcome payload (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub service_name: String,
    pub timestamp: i64,
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub latency_ms: f64,
}

/// Host resource sample payload (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPayload {
    pub service_name: String,
    pub timestamp: i64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
}

/// Payload received from an SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricPayload {
    Request(RequestPayload),
    System(SystemPayload),
}

impl MetricPayload {
    /// Parse a payload from raw JSON bytes.
    ///
    /// The tag is checked before the typed parse so an unknown `type` is
    /// reported as such instead of as a shape mismatch.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            Error::validation_code(ValidationErrorCode::InvalidPayload, e.to_string())
        })?;

        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing_field("type"))?;

        if !matches!(tag, "request" | "system") {
            return Err(Error::InvalidMetricType(tag.to_string()));
        }

        let payload: MetricPayload = serde_json::from_value(value).map_err(|e| {
            Error::validation_code(ValidationErrorCode::InvalidPayload, e.to_string())
        })?;

        if payload.service_name().trim().is_empty() {
            return Err(Error::missing_field("serviceName"));
        }

        Ok(payload)
    }

    pub fn service_name(&self) -> &str {
        match self {
            Self::Request(p) => &p.service_name,
            Self::System(p) => &p.service_name,
        }
    }

    /// Attach the owning project and produce a raw event.
    pub fn into_event(self, project_id: &str) -> RawMetricEvent {
        match self {
            Self::Request(p) => RequestEvent::new(
                project_id,
                p.service_name,
                p.timestamp,
                p.method,
                p.route,
                p.status_code,
                p.latency_ms,
            )
            .into(),
            Self::System(p) => SystemEvent::new(
                project_id,
                p.service_name,
                p.timestamp,
                p.cpu_usage_percent,
                p.memory_usage_mb,
            )
            .into(),
        }
    }
}
