//! Aggregate rows and grouping keys.
//!
//! One row per (grouping key, bucket) per resolution table. Rows are only
//! written through an upsert keyed on exactly that pair.

use serde::{Deserialize, Serialize};

use crate::events::{RequestEvent, SystemEvent};

/// Grouping key for request rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestKey {
    pub project_id: String,
    pub service_name: String,
    pub route: String,
    pub method: String,
}

impl From<&RequestEvent> for RequestKey {
    fn from(event: &RequestEvent) -> Self {
        Self {
            project_id: event.project_id.clone(),
            service_name: event.service_name.clone(),
            route: event.route.clone(),
            method: event.method.clone(),
        }
    }
}

/// Grouping key for system rows. Also used to filter read queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceKey {
    pub project_id: String,
    pub service_name: String,
}

impl ServiceKey {
    pub fn new(project_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            service_name: service_name.into(),
        }
    }

    pub fn matches(&self, project_id: &str, service_name: &str) -> bool {
        self.project_id == project_id && self.service_name == service_name
    }
}

impl From<&SystemEvent> for ServiceKey {
    fn from(event: &SystemEvent) -> Self {
        Self::new(event.project_id.clone(), event.service_name.clone())
    }
}

/// Request statistics for one (route, method) over one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAggregate {
    pub project_id: String,
    pub service_name: String,
    pub route: String,
    pub method: String,
    pub bucket: i64,
    pub total_requests: u64,
    pub success_count: u64,
    pub client_error_count: u64,
    pub server_error_count: u64,
    pub avg_response_time: f64,
    pub max_response_time: f64,
    pub p95_response_time: f64,
}

impl RequestAggregate {
    pub fn key(&self) -> RequestKey {
        RequestKey {
            project_id: self.project_id.clone(),
            service_name: self.service_name.clone(),
            route: self.route.clone(),
            method: self.method.clone(),
        }
    }

    pub fn service_key(&self) -> ServiceKey {
        ServiceKey::new(self.project_id.clone(), self.service_name.clone())
    }

    pub fn error_count(&self) -> u64 {
        self.client_error_count + self.server_error_count
    }
}

/// Resource statistics for one service over one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAggregate {
    pub project_id: String,
    pub service_name: String,
    pub bucket: i64,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_memory_mb: f64,
    pub max_memory_mb: f64,
}

impl SystemAggregate {
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(self.project_id.clone(), self.service_name.clone())
    }
}
