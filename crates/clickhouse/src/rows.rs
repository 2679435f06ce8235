//! Row types exchanged with ClickHouse.
//!
//! Field order matches the column order in `schema`. Aggregate rows carry a
//! `version` that decides which duplicate ReplacingMergeTree keeps.

use clickhouse::Row;
use engine_core::{RequestAggregate, RequestEvent, SystemAggregate, SystemEvent};
use serde::{Deserialize, Serialize};

/// Row for the raw request table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct RawRequestRow {
    pub project_id: String,
    pub service_name: String,
    pub timestamp: i64, // milliseconds since epoch
    pub method: String,
    pub route: String,
    pub status_code: u16,
    pub latency_ms: f64,
    pub is_error: bool,
}

impl From<RequestEvent> for RawRequestRow {
    fn from(e: RequestEvent) -> Self {
        Self {
            project_id: e.project_id,
            service_name: e.service_name,
            timestamp: e.timestamp,
            method: e.method,
            route: e.route,
            status_code: e.status_code,
            latency_ms: e.latency_ms,
            is_error: e.is_error,
        }
    }
}

impl From<RawRequestRow> for RequestEvent {
    fn from(r: RawRequestRow) -> Self {
        Self {
            project_id: r.project_id,
            service_name: r.service_name,
            timestamp: r.timestamp,
            method: r.method,
            route: r.route,
            status_code: r.status_code,
            latency_ms: r.latency_ms,
            is_error: r.is_error,
        }
    }
}

/// Row for the raw system table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct RawSystemRow {
    pub project_id: String,
    pub service_name: String,
    pub timestamp: i64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
}

impl From<SystemEvent> for RawSystemRow {
    fn from(e: SystemEvent) -> Self {
        Self {
            project_id: e.project_id,
            service_name: e.service_name,
            timestamp: e.timestamp,
            cpu_usage_percent: e.cpu_usage_percent,
            memory_usage_mb: e.memory_usage_mb,
        }
    }
}

impl From<RawSystemRow> for SystemEvent {
    fn from(r: RawSystemRow) -> Self {
        Self {
            project_id: r.project_id,
            service_name: r.service_name,
            timestamp: r.timestamp,
            cpu_usage_percent: r.cpu_usage_percent,
            memory_usage_mb: r.memory_usage_mb,
        }
    }
}

/// Row for the request aggregate tables.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct RequestAggregateRow {
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
    pub version: u64,
}

impl RequestAggregateRow {
    pub fn new(row: RequestAggregate, version: u64) -> Self {
        Self {
            project_id: row.project_id,
            service_name: row.service_name,
            route: row.route,
            method: row.method,
            bucket: row.bucket,
            total_requests: row.total_requests,
            success_count: row.success_count,
            client_error_count: row.client_error_count,
            server_error_count: row.server_error_count,
            avg_response_time: row.avg_response_time,
            max_response_time: row.max_response_time,
            p95_response_time: row.p95_response_time,
            version,
        }
    }
}

impl From<RequestAggregateRow> for RequestAggregate {
    fn from(r: RequestAggregateRow) -> Self {
        Self {
            project_id: r.project_id,
            service_name: r.service_name,
            route: r.route,
            method: r.method,
            bucket: r.bucket,
            total_requests: r.total_requests,
            success_count: r.success_count,
            client_error_count: r.client_error_count,
            server_error_count: r.server_error_count,
            avg_response_time: r.avg_response_time,
            max_response_time: r.max_response_time,
            p95_response_time: r.p95_response_time,
        }
    }
}

/// Row for the system aggregate tables.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SystemAggregateRow {
    pub project_id: String,
    pub service_name: String,
    pub bucket: i64,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_memory_mb: f64,
    pub max_memory_mb: f64,
    pub version: u64,
}

impl SystemAggregateRow {
    pub fn new(row: SystemAggregate, version: u64) -> Self {
        Self {
            project_id: row.project_id,
            service_name: row.service_name,
            bucket: row.bucket,
            avg_cpu: row.avg_cpu,
            max_cpu: row.max_cpu,
            avg_memory_mb: row.avg_memory_mb,
            max_memory_mb: row.max_memory_mb,
            version,
        }
    }
}

impl From<SystemAggregateRow> for SystemAggregate {
    fn from(r: SystemAggregateRow) -> Self {
        Self {
            project_id: r.project_id,
            service_name: r.service_name,
            bucket: r.bucket,
            avg_cpu: r.avg_cpu,
            max_cpu: r.max_cpu,
            avg_memory_mb: r.avg_memory_mb,
            max_memory_mb: r.max_memory_mb,
        }
    }
}
