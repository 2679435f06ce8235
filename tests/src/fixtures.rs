//! Test fixtures and payload generators.

use engine_core::{ONE_HOUR_MS, ONE_MINUTE_MS};
use serde_json::{json, Value};

/// Project used by default in collection requests.
pub const PROJECT_ID: &str = "proj-test";

/// Service used by default in payloads.
pub const SERVICE: &str = "checkout";

/// 2023-11-14T00:00:00Z, aligned to a day boundary.
pub const DAY_START: i64 = 1_699_920_000_000;

/// Start of minute `n` of the test day.
pub fn minute(n: i64) -> i64 {
    DAY_START + n * ONE_MINUTE_MS
}

/// Start of hour `n` of the test day.
pub fn hour(n: i64) -> i64 {
    DAY_START + n * ONE_HOUR_MS
}

/// Request payload as an SDK would send it.
pub fn request_payload(
    service: &str,
    timestamp: i64,
    method: &str,
    route: &str,
    status_code: u16,
    latency_ms: f64,
) -> Value {
    json!({
        "type": "request",
        "serviceName": service,
        "timestamp": timestamp,
        "method": method,
        "route": route,
        "statusCode": status_code,
        "latencyMs": latency_ms,
    })
}

/// System sample payload as an SDK would send it.
pub fn system_payload(service: &str, timestamp: i64, cpu: f64, memory_mb: f64) -> Value {
    json!({
        "type": "system",
        "serviceName": service,
        "timestamp": timestamp,
        "cpuUsagePercent": cpu,
        "memoryUsageMb": memory_mb,
    })
}

/// Ten `GET /x` requests: statuses 200×8, 404, 500 and the given latencies.
pub fn worked_example_requests(window_start: i64) -> Vec<Value> {
    let statuses = [200, 200, 200, 200, 200, 404, 200, 200, 500, 200];
    let latencies = [10.0, 12.0, 11.0, 9.0, 14.0, 100.0, 13.0, 15.0, 20.0, 8.0];
    statuses
        .iter()
        .zip(latencies)
        .enumerate()
        .map(|(i, (&status, latency))| {
            request_payload(SERVICE, window_start + i as i64 * 1_000, "GET", "/x", status, latency)
        })
        .collect()
}
