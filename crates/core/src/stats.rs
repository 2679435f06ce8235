//! Rollup math.
//!
//! Minute rows are summarized from raw events; hour and day rows are
//! recombined from rows one resolution finer. All reducers are pure and
//! deterministic (groups are emitted in key order), so re-running them over
//! the same inputs yields identical rows.
//!
//! Two approximations are kept on purpose:
//! - p95 is nearest-rank at index `floor(0.95 * n)`, and coarser levels take
//!   the max of the finer p95 values instead of recomputing.
//! - Latency averages are recombined weighted by request count, while CPU
//!   and memory averages are recombined as a plain mean of sub-window means.

use std::collections::BTreeMap;

use crate::aggregate::{RequestAggregate, RequestKey, ServiceKey, SystemAggregate};
use crate::events::{RequestEvent, SystemEvent};

/// Nearest-rank p95: the element at index `floor(0.95 * n)` of the ascending sort.
///
/// Returns 0 for an empty slice.
pub fn p95_nearest_rank(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let index = ((0.95 * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Arithmetic mean, 0 for an empty iterator.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Maximum, 0 for an empty iterator.
pub fn max<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().reduce(f64::max).unwrap_or(0.0)
}

/// Request-count-weighted mean of per-row averages, 0 when there are no requests.
pub fn weighted_avg_response_time<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a RequestAggregate>,
{
    let (weighted_sum, total) = rows.into_iter().fold((0.0, 0u64), |(sum, total), row| {
        (
            sum + row.avg_response_time * row.total_requests as f64,
            total + row.total_requests,
        )
    });
    if total == 0 {
        0.0
    } else {
        weighted_sum / total as f64
    }
}

/// Summarize raw request events into one minute row per grouping key.
pub fn summarize_requests(events: &[RequestEvent], bucket: i64) -> Vec<RequestAggregate> {
    let mut grouped: BTreeMap<RequestKey, Vec<&RequestEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(RequestKey::from(event)).or_default().push(event);
    }

    grouped
        .into_iter()
        .map(|(key, group)| {
            let latencies: Vec<f64> = group.iter().map(|e| e.latency_ms).collect();
            let count_status = |range: std::ops::Range<u16>| {
                group.iter().filter(|e| range.contains(&e.status_code)).count() as u64
            };

            RequestAggregate {
                project_id: key.project_id,
                service_name: key.service_name,
                route: key.route,
                method: key.method,
                bucket,
                total_requests: group.len() as u64,
                success_count: count_status(200..300),
                client_error_count: count_status(400..500),
                server_error_count: group.iter().filter(|e| e.status_code >= 500).count() as u64,
                avg_response_time: mean(latencies.iter().copied()),
                max_response_time: max(latencies.iter().copied()),
                p95_response_time: p95_nearest_rank(&latencies),
            }
        })
        .collect()
}

/// Summarize raw system samples into one minute row per service.
pub fn summarize_system(events: &[SystemEvent], bucket: i64) -> Vec<SystemAggregate> {
    let mut grouped: BTreeMap<ServiceKey, Vec<&SystemEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(ServiceKey::from(event)).or_default().push(event);
    }

    grouped
        .into_iter()
        .map(|(key, group)| SystemAggregate {
            project_id: key.project_id,
            service_name: key.service_name,
            bucket,
            avg_cpu: mean(group.iter().map(|e| e.cpu_usage_percent)),
            max_cpu: max(group.iter().map(|e| e.cpu_usage_percent)),
            avg_memory_mb: mean(group.iter().map(|e| e.memory_usage_mb)),
            max_memory_mb: max(group.iter().map(|e| e.memory_usage_mb)),
        })
        .collect()
}

/// Recombine finer request rows into one row per grouping key at `bucket`.
pub fn combine_requests(rows: &[RequestAggregate], bucket: i64) -> Vec<RequestAggregate> {
    let mut grouped: BTreeMap<RequestKey, Vec<&RequestAggregate>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.key()).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(key, group)| RequestAggregate {
            project_id: key.project_id,
            service_name: key.service_name,
            route: key.route,
            method: key.method,
            bucket,
            total_requests: group.iter().map(|r| r.total_requests).sum(),
            success_count: group.iter().map(|r| r.success_count).sum(),
            client_error_count: group.iter().map(|r| r.client_error_count).sum(),
            server_error_count: group.iter().map(|r| r.server_error_count).sum(),
            avg_response_time: weighted_avg_response_time(group.iter().copied()),
            max_response_time: max(group.iter().map(|r| r.max_response_time)),
            p95_response_time: max(group.iter().map(|r| r.p95_response_time)),
        })
        .collect()
}

/// Recombine finer system rows into one row per service at `bucket`.
pub fn combine_system(rows: &[SystemAggregate], bucket: i64) -> Vec<SystemAggregate> {
    let mut grouped: BTreeMap<ServiceKey, Vec<&SystemAggregate>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.key()).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(key, group)| SystemAggregate {
            project_id: key.project_id,
            service_name: key.service_name,
            bucket,
            avg_cpu: mean(group.iter().map(|r| r.avg_cpu)),
            max_cpu: max(group.iter().map(|r| r.max_cpu)),
            avg_memory_mb: mean(group.iter().map(|r| r.avg_memory_mb)),
            max_memory_mb: max(group.iter().map(|r| r.max_memory_mb)),
        })
        .collect()
}
