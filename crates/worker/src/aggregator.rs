//! Per-resolution aggregators.
//!
//! Each aggregator owns exactly one resolution level and only ever writes
//! rows of that level. Inputs come from one level finer (raw events for the
//! minute level). A window with no input is a silent no-op.

use async_trait::async_trait;
use engine_core::stats::{combine_requests, combine_system, summarize_requests, summarize_system};
use engine_core::{BucketRange, MetricKind, MetricStore, Resolution, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of aggregating one window for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutcome {
    pub resolution: Resolution,
    pub kind: MetricKind,
    pub window: BucketRange,
    /// Rows upserted; 0 when the window had no input.
    pub rows_written: usize,
}

impl StageOutcome {
    pub fn is_empty(&self) -> bool {
        self.rows_written == 0
    }
}

/// Aggregates closed windows of one resolution level.
#[async_trait]
pub trait WindowAggregator: Send + Sync {
    /// Resolution of the rows this aggregator writes.
    fn resolution(&self) -> Resolution;

    /// Aggregate one window. `window` must be aligned to this resolution.
    async fn aggregate_window(&self, kind: MetricKind, window: BucketRange) -> Result<StageOutcome>;

    /// Aggregate the most recently closed window as of `now_ms`.
    async fn run(&self, kind: MetricKind, now_ms: i64) -> Result<StageOutcome> {
        let window = self.resolution().closed_window(now_ms);
        self.aggregate_window(kind, window).await
    }
}

fn finish(
    resolution: Resolution,
    kind: MetricKind,
    window: BucketRange,
    rows_written: usize,
) -> StageOutcome {
    if rows_written == 0 {
        debug!(resolution = %resolution, kind = %kind, window = %window, "No input for window");
    } else {
        info!(
            resolution = %resolution,
            kind = %kind,
            bucket_start = window.start,
            bucket_end = window.end,
            rows = rows_written,
            "Window aggregated"
        );
    }
    StageOutcome {
        resolution,
        kind,
        window,
        rows_written,
    }
}

/// Reduces raw events into minute rows.
pub struct MinuteAggregator {
    store: Arc<dyn MetricStore>,
}

impl MinuteAggregator {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WindowAggregator for MinuteAggregator {
    fn resolution(&self) -> Resolution {
        Resolution::Minute
    }

    async fn aggregate_window(
        &self,
        kind: MetricKind,
        window: BucketRange,
    ) -> Result<StageOutcome> {
        let resolution = self.resolution();
        let written = match kind {
            MetricKind::Request => {
                let events = self.store.raw_requests(window).await?;
                if events.is_empty() {
                    0
                } else {
                    let rows = summarize_requests(&events, window.start);
                    self.store.upsert_request_rows(resolution, rows).await?
                }
            }
            MetricKind::System => {
                let events = self.store.raw_system(window).await?;
                if events.is_empty() {
                    0
                } else {
                    let rows = summarize_system(&events, window.start);
                    self.store.upsert_system_rows(resolution, rows).await?
                }
            }
        };
        Ok(finish(resolution, kind, window, written))
    }
}

/// Recombines rows of the next-finer resolution into hour or day rows.
pub struct RollupAggregator {
    resolution: Resolution,
    source: Resolution,
    store: Arc<dyn MetricStore>,
}

impl RollupAggregator {
    /// Hour rows from minute rows.
    pub fn hourly(store: Arc<dyn MetricStore>) -> Self {
        Self {
            resolution: Resolution::Hour,
            source: Resolution::Minute,
            store,
        }
    }

    /// Day rows from hour rows.
    pub fn daily(store: Arc<dyn MetricStore>) -> Self {
        Self {
            resolution: Resolution::Day,
            source: Resolution::Hour,
            store,
        }
    }

    pub fn source(&self) -> Resolution {
        self.source
    }
}

#[async_trait]
impl WindowAggregator for RollupAggregator {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    async fn aggregate_window(
        &self,
        kind: MetricKind,
        window: BucketRange,
    ) -> Result<StageOutcome> {
        let written = match kind {
            MetricKind::Request => {
                let rows = self.store.request_rows(self.source, window, None).await?;
                if rows.is_empty() {
                    0
                } else {
                    let combined = combine_requests(&rows, window.start);
                    self.store.upsert_request_rows(self.resolution, combined).await?
                }
            }
            MetricKind::System => {
                let rows = self.store.system_rows(self.source, window, None).await?;
                if rows.is_empty() {
                    0
                } else {
                    let combined = combine_system(&rows, window.start);
                    self.store.upsert_system_rows(self.resolution, combined).await?
                }
            }
        };
        Ok(finish(self.resolution, kind, window, written))
    }
}

/// Build the aggregator that owns `resolution`.
pub fn aggregator_for(
    resolution: Resolution,
    store: Arc<dyn MetricStore>,
) -> Arc<dyn WindowAggregator> {
    match resolution {
        Resolution::Minute => Arc::new(MinuteAggregator::new(store)),
        Resolution::Hour => Arc::new(RollupAggregator::hourly(store)),
        Resolution::Day => Arc::new(RollupAggregator::daily(store)),
    }
}
