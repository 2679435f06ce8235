//! End-to-end rollup: collect over HTTP, run each stage, read back.

use engine_core::{
    BucketRange, MetricKind, MetricStore, Resolution, ONE_DAY_MS, ONE_HOUR_MS, ONE_MINUTE_MS,
};
use integration_tests::fixtures::{self, request_payload, system_payload, SERVICE};
use integration_tests::setup::TestContext;

fn all_buckets() -> BucketRange {
    BucketRange::new(0, i64::MAX)
}

/// Minute aggregation reproduces the documented worked example.
#[tokio::test]
async fn test_minute_worked_example() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(&server, &fixtures::worked_example_requests(fixtures::minute(5)))
        .await;

    let report = ctx.tick(Resolution::Minute, fixtures::minute(6)).await;
    assert!(!report.skipped);
    assert_eq!(report.failures(), 0);

    let rows = ctx
        .store
        .request_rows(Resolution::Minute, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.bucket, fixtures::minute(5));
    assert_eq!(row.route, "/x");
    assert_eq!(row.method, "GET");
    assert_eq!(row.total_requests, 10);
    assert_eq!(row.success_count, 8);
    assert_eq!(row.client_error_count, 1);
    assert_eq!(row.server_error_count, 1);
    assert!((row.avg_response_time - 21.2).abs() < 1e-9);
    assert_eq!(row.max_response_time, 100.0);
    assert_eq!(row.p95_response_time, 100.0);
}

/// System minute aggregation: cpu [40, 50, 60] → avg 50, max 60.
#[tokio::test]
async fn test_system_minute_worked_example() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let payloads: Vec<_> = [40.0, 50.0, 60.0]
        .iter()
        .enumerate()
        .map(|(i, &cpu)| {
            system_payload(SERVICE, fixtures::minute(2) + i as i64, cpu, 256.0)
        })
        .collect();
    ctx.collect_all(&server, &payloads).await;

    ctx.tick(Resolution::Minute, fixtures::minute(3)).await;

    let rows = ctx
        .store
        .system_rows(Resolution::Minute, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].avg_cpu, 50.0);
    assert_eq!(rows[0].max_cpu, 60.0);
    assert_eq!(rows[0].avg_memory_mb, 256.0);
}

/// Only the window that just closed is aggregated; the open one is left alone.
#[tokio::test]
async fn test_tick_targets_closed_window_only() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, fixtures::minute(1) + 59_999, "GET", "/a", 200, 5.0),
            request_payload(SERVICE, fixtures::minute(2), "GET", "/a", 200, 7.0),
        ],
    )
    .await;

    // Mid-way through minute 2: only minute 1 is closed.
    let report = ctx.tick(Resolution::Minute, fixtures::minute(2) + 30_000).await;
    assert_eq!(report.window, BucketRange::new(fixtures::minute(1), fixtures::minute(2)));

    let rows = ctx
        .store
        .request_rows(Resolution::Minute, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bucket, fixtures::minute(1));
    assert_eq!(rows[0].avg_response_time, 5.0);
}

/// An empty window writes nothing and is not a failure.
#[tokio::test]
async fn test_empty_window_is_noop() {
    let ctx = TestContext::new();

    for resolution in Resolution::ALL {
        let report = ctx.tick(resolution, fixtures::DAY_START + ONE_DAY_MS).await;
        assert_eq!(report.failures(), 0);
        assert_eq!(report.rows_written(), 0);
        assert_eq!(ctx.store.memory().row_count(resolution), 0);
    }
}

/// Hour rows weight latency by request count; system rows average unweighted.
#[tokio::test]
async fn test_hour_rollup_recombination() {
    let ctx = TestContext::new();
    let server = ctx.server();

    // Minute 0: 3 requests at 10ms. Minute 1: 1 request at 50ms.
    let mut payloads = Vec::new();
    for i in 0..3 {
        payloads.push(request_payload(SERVICE, fixtures::minute(0) + i, "GET", "/w", 200, 10.0));
    }
    payloads.push(request_payload(SERVICE, fixtures::minute(1), "GET", "/w", 503, 50.0));
    // Minute 0: cpu 10 and 20 (avg 15). Minute 1: cpu 90.
    payloads.push(system_payload(SERVICE, fixtures::minute(0), 10.0, 100.0));
    payloads.push(system_payload(SERVICE, fixtures::minute(0) + 1, 20.0, 100.0));
    payloads.push(system_payload(SERVICE, fixtures::minute(1), 90.0, 300.0));
    ctx.collect_all(&server, &payloads).await;

    ctx.tick(Resolution::Minute, fixtures::minute(1)).await;
    ctx.tick(Resolution::Minute, fixtures::minute(2)).await;
    let report = ctx.tick(Resolution::Hour, fixtures::hour(1)).await;
    assert_eq!(report.failures(), 0);

    let hour = ctx
        .store
        .request_rows(Resolution::Hour, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(hour.len(), 1);
    assert_eq!(hour[0].bucket, fixtures::hour(0));
    assert_eq!(hour[0].total_requests, 4);
    assert_eq!(hour[0].server_error_count, 1);
    // (3 * 10 + 1 * 50) / 4
    assert!((hour[0].avg_response_time - 20.0).abs() < 1e-9);
    assert_eq!(hour[0].max_response_time, 50.0);
    assert_eq!(hour[0].p95_response_time, 50.0);

    let system = ctx
        .store
        .system_rows(Resolution::Hour, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(system.len(), 1);
    // Mean of minute means (15, 90), not of the three samples.
    assert_eq!(system[0].avg_cpu, 52.5);
    assert_eq!(system[0].max_cpu, 90.0);
    assert_eq!(system[0].avg_memory_mb, 200.0);
}

/// Day rows recombine hour rows.
#[tokio::test]
async fn test_day_rollup_from_hours() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, fixtures::hour(2), "POST", "/pay", 201, 30.0),
            request_payload(SERVICE, fixtures::hour(20), "POST", "/pay", 404, 90.0),
        ],
    )
    .await;

    for h in [2, 20] {
        ctx.tick(Resolution::Minute, fixtures::hour(h) + ONE_MINUTE_MS).await;
        ctx.tick(Resolution::Hour, fixtures::hour(h + 1)).await;
    }
    ctx.tick(Resolution::Day, fixtures::DAY_START + ONE_DAY_MS).await;

    let day = ctx
        .store
        .request_rows(Resolution::Day, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].bucket, fixtures::DAY_START);
    assert_eq!(day[0].total_requests, 2);
    assert_eq!(day[0].success_count, 1);
    assert_eq!(day[0].client_error_count, 1);
    assert_eq!(day[0].avg_response_time, 60.0);
}

/// The hour row closing at a boundary includes that boundary's last minute,
/// even when both stages fire at once.
#[tokio::test]
async fn test_hour_row_includes_last_minute() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, fixtures::minute(58), "GET", "/", 200, 10.0),
            request_payload(SERVICE, fixtures::minute(59), "GET", "/", 500, 1000.0),
        ],
    )
    .await;

    ctx.tick(Resolution::Minute, fixtures::minute(59)).await;
    let (hour, _) = tokio::join!(
        ctx.tick(Resolution::Hour, fixtures::hour(1)),
        ctx.tick(Resolution::Minute, fixtures::hour(1)),
    );
    assert_eq!(hour.failures(), 0);

    let window = BucketRange::new(fixtures::hour(0), fixtures::hour(1));
    let minutes = ctx
        .store
        .request_rows(Resolution::Minute, window, None)
        .await
        .unwrap();
    let hours = ctx
        .store
        .request_rows(Resolution::Hour, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(minutes.len(), 2);
    assert_eq!(hours.len(), 1);
    assert_eq!(
        hours[0].total_requests,
        minutes.iter().map(|r| r.total_requests).sum::<u64>()
    );
    assert_eq!(hours[0].server_error_count, 1);
    assert_eq!(hours[0].max_response_time, 1000.0);
}

/// The boundary timer path closes minute, hour and day in one pass at midnight.
#[tokio::test]
async fn test_midnight_boundary_closes_every_level() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let midnight = fixtures::DAY_START + ONE_DAY_MS;

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, midnight - 30_000, "GET", "/", 200, 40.0),
            system_payload(SERVICE, midnight - 20_000, 70.0, 512.0),
        ],
    )
    .await;

    let reports = ctx.run_boundary(midnight).await;
    let order: Vec<Resolution> = reports.iter().map(|r| r.resolution).collect();
    assert_eq!(order, vec![Resolution::Minute, Resolution::Hour, Resolution::Day]);
    assert!(reports.iter().all(|r| r.failures() == 0 && r.rows_written() == 2));

    let day = ctx
        .store
        .system_rows(Resolution::Day, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].bucket, fixtures::DAY_START);
    assert_eq!(day[0].max_cpu, 70.0);
}

/// Re-running a stage over the same window overwrites, never accumulates.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(&server, &fixtures::worked_example_requests(fixtures::minute(0)))
        .await;

    ctx.tick(Resolution::Minute, fixtures::minute(1)).await;
    ctx.tick(Resolution::Hour, fixtures::hour(1)).await;
    let first = ctx
        .store
        .request_rows(Resolution::Hour, all_buckets(), None)
        .await
        .unwrap();

    ctx.tick(Resolution::Minute, fixtures::minute(1)).await;
    ctx.tick(Resolution::Hour, fixtures::hour(1)).await;
    let second = ctx
        .store
        .request_rows(Resolution::Hour, all_buckets(), None)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second[0].total_requests, 10);
    assert_eq!(ctx.store.memory().row_count(Resolution::Minute), 1);
}

/// A failing store is reported per metric kind and the next tick recovers.
#[tokio::test]
async fn test_store_failure_then_retry() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, fixtures::minute(0), "GET", "/", 200, 1.0),
            system_payload(SERVICE, fixtures::minute(0), 5.0, 10.0),
        ],
    )
    .await;

    ctx.store.set_fail_writes(true);
    let report = ctx.tick(Resolution::Minute, fixtures::minute(1)).await;
    assert_eq!(report.failures(), 2);
    assert!(report
        .outcomes
        .iter()
        .any(|(kind, result)| *kind == MetricKind::System && result.is_err()));

    ctx.store.set_fail_writes(false);
    let report = ctx.tick(Resolution::Minute, fixtures::minute(1)).await;
    assert_eq!(report.failures(), 0);
    assert_eq!(report.rows_written(), 2);
}

/// Backfill fills every level over a historical range.
#[tokio::test]
async fn test_backfill_fills_all_levels() {
    let ctx = TestContext::new();
    let server = ctx.server();

    ctx.collect_all(
        &server,
        &[
            request_payload(SERVICE, fixtures::hour(3) + 42, "GET", "/", 200, 12.0),
            system_payload(SERVICE, fixtures::hour(3) + 42, 33.0, 64.0),
        ],
    )
    .await;

    let now = fixtures::DAY_START + ONE_DAY_MS + ONE_HOUR_MS;
    let result = ctx
        .backfill(fixtures::DAY_START, fixtures::DAY_START + ONE_DAY_MS, now)
        .await;
    assert_eq!(result.minute_rows, 2);
    assert_eq!(result.hour_rows, 2);
    assert_eq!(result.day_rows, 2);

    let day = ctx
        .store
        .system_rows(Resolution::Day, all_buckets(), None)
        .await
        .unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].avg_cpu, 33.0);
}
