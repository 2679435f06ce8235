//! Backfill worker for re-aggregating historical windows.
//!
//! Runs minute, then hour, then day aggregation over every closed window
//! that intersects the requested range. Every stage upserts, so backfilling
//! windows that were already aggregated rewrites the same values.

use engine_core::error::ValidationErrorCode;
use engine_core::{align_down, Error, MetricKind, MetricStore, Resolution, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregator::{aggregator_for, WindowAggregator};

/// Worker that recomputes aggregate rows for a time range.
pub struct BackfillWorker {
    store: Arc<dyn MetricStore>,
}

impl BackfillWorker {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Re-aggregate `[from, to)` as of `now_ms`. Windows still open at
    /// `now_ms` are left alone.
    pub async fn run(&self, from: i64, to: i64, now_ms: i64) -> Result<BackfillResult> {
        if from >= to {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidRange,
                format!("backfill range is empty: from={} to={}", from, to),
            ));
        }

        info!(from = from, to = to, "Running backfill");

        let mut result = BackfillResult {
            from,
            to,
            windows: 0,
            minute_rows: 0,
            hour_rows: 0,
            day_rows: 0,
        };

        // Finer levels first: each level reads what the previous one wrote.
        for resolution in Resolution::ALL {
            let aggregator = aggregator_for(resolution, self.store.clone());
            let rows = self
                .backfill_level(aggregator.as_ref(), from, to, now_ms, &mut result.windows)
                .await?;
            match resolution {
                Resolution::Minute => result.minute_rows = rows,
                Resolution::Hour => result.hour_rows = rows,
                Resolution::Day => result.day_rows = rows,
            }
        }

        debug!(result = ?result, "Backfill complete");
        Ok(result)
    }

    async fn backfill_level(
        &self,
        aggregator: &dyn WindowAggregator,
        from: i64,
        to: i64,
        now_ms: i64,
        windows: &mut usize,
    ) -> Result<usize> {
        let resolution = aggregator.resolution();
        let window_ms = resolution.window_ms();
        let mut rows = 0;
        let mut start = align_down(from, window_ms);

        while start < to {
            let window = resolution.window_at(start);
            if window.end > now_ms {
                break;
            }
            for kind in MetricKind::ALL {
                rows += aggregator.aggregate_window(kind, window).await?.rows_written;
            }
            *windows += 1;
            start += window_ms;
        }

        Ok(rows)
    }
}

/// Result of a backfill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillResult {
    pub from: i64,
    pub to: i64,
    /// Windows visited across all levels.
    pub windows: usize,
    pub minute_rows: usize,
    pub hour_rows: usize,
    pub day_rows: usize,
}
