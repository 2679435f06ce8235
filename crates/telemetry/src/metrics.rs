//! In-process counters for the rollup engine.
//!
//! Collection and reads are counted globally. Each rollup stage (minute,
//! hour, day) keeps its own run, failure, skip and row counters plus a
//! latency histogram. The scheduler logs a snapshot once per minute tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Number of stage runs currently executing.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        // Saturate at zero so an unmatched dec cannot wrap.
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Upper bounds (ms) of the latency buckets. Day stages over a busy store can
/// take tens of seconds, so the range runs to a minute.
pub const LATENCY_BOUNDS_MS: [u64; 10] =
    [5, 25, 100, 250, 1_000, 2_500, 5_000, 15_000, 30_000, 60_000];

/// Latency histogram. Values past the last bound land in the last bucket.
#[derive(Debug, Default)]
pub struct Histogram {
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = LATENCY_BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(LATENCY_BOUNDS_MS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    /// `(upper bound, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        LATENCY_BOUNDS_MS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Counters for one rollup stage.
#[derive(Debug, Default)]
pub struct StageMetrics {
    /// One per (stage, metric kind) run.
    pub runs: Counter,
    pub failures: Counter,
    /// Ticks dropped because the previous run was still going.
    pub skipped: Counter,
    pub rows_upserted: Counter,
    pub latency_ms: Histogram,
}

impl StageMetrics {
    fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            runs: self.runs.get(),
            failures: self.failures.get(),
            skipped: self.skipped.get(),
            rows_upserted: self.rows_upserted.get(),
            latency_mean_ms: self.latency_ms.mean(),
            latency_max_ms: self.latency_ms.max(),
        }
    }
}

/// Process-wide metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    pub events_ingested: Counter,
    pub events_rejected: Counter,

    pub minute_stage: StageMetrics,
    pub hour_stage: StageMetrics,
    pub day_stage: StageMetrics,
    pub running_stages: Gauge,

    pub queries_served: Counter,
    pub query_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn stages(&self) -> [&StageMetrics; 3] {
        [&self.minute_stage, &self.hour_stage, &self.day_stage]
    }

    /// Aggregate rows written by every stage.
    pub fn rows_upserted(&self) -> u64 {
        self.stages().iter().map(|s| s.rows_upserted.get()).sum()
    }

    pub fn stage_failures(&self) -> u64 {
        self.stages().iter().map(|s| s.failures.get()).sum()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_ingested: self.events_ingested.get(),
            events_rejected: self.events_rejected.get(),
            minute: self.minute_stage.snapshot(),
            hour: self.hour_stage.snapshot(),
            day: self.day_stage.snapshot(),
            running_stages: self.running_stages.get(),
            queries_served: self.queries_served.get(),
            query_latency_mean_ms: self.query_latency_ms.mean(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub runs: u64,
    pub failures: u64,
    pub skipped: u64,
    pub rows_upserted: u64,
    pub latency_mean_ms: f64,
    pub latency_max_ms: u64,
}

/// Metrics at a point in time, as logged by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_ingested: u64,
    pub events_rejected: u64,
    pub minute: StageSnapshot,
    pub hour: StageSnapshot,
    pub day: StageSnapshot,
    pub running_stages: u64,
    pub queries_served: u64,
    pub query_latency_mean_ms: f64,
}

static METRICS: LazyLock<Metrics> = LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
