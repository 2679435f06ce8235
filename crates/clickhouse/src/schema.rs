//! ClickHouse table schemas.
//!
//! - Raw tables are plain MergeTree, ordered by (project, service, timestamp).
//! - Aggregate tables are ReplacingMergeTree(version) keyed by the grouping
//!   key plus `bucket`, so re-inserting a row for the same key and bucket
//!   replaces it. Reads use `FINAL` to see the replaced state.
//! - Timestamps and buckets are DateTime64(3), exchanged as epoch millis.

use engine_core::{MetricKind, Resolution};

pub const RAW_REQUEST_TABLE: &str = "request_metrics";
pub const RAW_SYSTEM_TABLE: &str = "system_metrics";

/// Name of the aggregate table for a metric kind and resolution.
pub fn aggregate_table(kind: MetricKind, resolution: Resolution) -> &'static str {
    match (kind, resolution) {
        (MetricKind::Request, Resolution::Minute) => "request_metrics_minute",
        (MetricKind::Request, Resolution::Hour) => "request_metrics_hour",
        (MetricKind::Request, Resolution::Day) => "request_metrics_day",
        (MetricKind::System, Resolution::Minute) => "system_metrics_minute",
        (MetricKind::System, Resolution::Hour) => "system_metrics_hour",
        (MetricKind::System, Resolution::Day) => "system_metrics_day",
    }
}

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// SQL for the raw request table.
pub fn create_raw_request_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{RAW_REQUEST_TABLE} (
    project_id String,
    service_name LowCardinality(String),
    timestamp DateTime64(3),
    method LowCardinality(String),
    route String,
    status_code UInt16,
    latency_ms Float64,
    is_error Bool,
    received_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (project_id, service_name, timestamp)
SETTINGS index_granularity = 8192
"#
    )
}

/// SQL for the raw system table.
pub fn create_raw_system_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{RAW_SYSTEM_TABLE} (
    project_id String,
    service_name LowCardinality(String),
    timestamp DateTime64(3),
    cpu_usage_percent Float64,
    memory_usage_mb Float64,
    received_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (project_id, service_name, timestamp)
SETTINGS index_granularity = 8192
"#
    )
}

/// SQL for one request aggregate table.
pub fn create_request_aggregate_table(database: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    project_id String,
    service_name LowCardinality(String),
    route String,
    method LowCardinality(String),
    bucket DateTime64(3),
    total_requests UInt64,
    success_count UInt64,
    client_error_count UInt64,
    server_error_count UInt64,
    avg_response_time Float64,
    max_response_time Float64,
    p95_response_time Float64,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
PARTITION BY toYYYYMM(bucket)
ORDER BY (project_id, service_name, route, method, bucket)
SETTINGS index_granularity = 8192
"#
    )
}

/// SQL for one system aggregate table.
pub fn create_system_aggregate_table(database: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    project_id String,
    service_name LowCardinality(String),
    bucket DateTime64(3),
    avg_cpu Float64,
    max_cpu Float64,
    avg_memory_mb Float64,
    max_memory_mb Float64,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
PARTITION BY toYYYYMM(bucket)
ORDER BY (project_id, service_name, bucket)
SETTINGS index_granularity = 8192
"#
    )
}

/// All table creation statements for `database`, database first.
pub fn all_tables(database: &str) -> Vec<String> {
    let mut statements = vec![
        create_database(database),
        create_raw_request_table(database),
        create_raw_system_table(database),
    ];
    for resolution in Resolution::ALL {
        statements.push(create_request_aggregate_table(
            database,
            aggregate_table(MetricKind::Request, resolution),
        ));
        statements.push(create_system_aggregate_table(
            database,
            aggregate_table(MetricKind::System, resolution),
        ));
    }
    statements
}
