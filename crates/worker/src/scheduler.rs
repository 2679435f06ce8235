//! Rollup stage scheduler.
//!
//! A single timer fires on every minute boundary. Each boundary runs the
//! stages whose window closes there in finer-to-coarser order, so the hour
//! stage at `H` reads the minute row for `[H - 1m, H)` only after the minute
//! stage has written it, and the day stage likewise waits for the last hour.
//! Request and system aggregation for a stage run independently; a failure
//! in one is logged and does not stop the other or the next tick.
//!
//! A coarser tick invoked on its own still waits (bounded by one finer
//! window) when the finer stage is live and has not yet closed the same
//! boundary.
//!
//! Overlapping runs of the same stage are prevented with a skip-if-running
//! guard: a tick that finds its stage still running is dropped and counted.

use chrono::Utc;
use engine_core::{align_down, BucketRange, MetricKind, MetricStore, Resolution, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use telemetry::{health, metrics, StageMetrics};

use crate::aggregator::{aggregator_for, StageOutcome, WindowAggregator};
use crate::backfill::{BackfillResult, BackfillWorker};

fn stage_metrics(resolution: Resolution) -> &'static StageMetrics {
    match resolution {
        Resolution::Minute => &metrics().minute_stage,
        Resolution::Hour => &metrics().hour_stage,
        Resolution::Day => &metrics().day_stage,
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub minute_enabled: bool,
    #[serde(default = "default_true")]
    pub hour_enabled: bool,
    #[serde(default = "default_true")]
    pub day_enabled: bool,
    /// Closed minute windows to re-aggregate on startup (0 disables catch-up)
    #[serde(default)]
    pub catch_up_windows: u32,
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            minute_enabled: true,
            hour_enabled: true,
            day_enabled: true,
            catch_up_windows: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn is_enabled(&self, resolution: Resolution) -> bool {
        match resolution {
            Resolution::Minute => self.minute_enabled,
            Resolution::Hour => self.hour_enabled,
            Resolution::Day => self.day_enabled,
        }
    }
}

/// Execution state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    Running,
}

/// Skip-if-running guard for one stage.
#[derive(Debug, Default)]
pub struct StageGuard {
    running: AtomicBool,
}

impl StageGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move Idle → Running. Returns `None` if the stage is already running.
    pub fn try_acquire(&self) -> Option<RunningStage<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningStage { guard: self })
    }

    pub fn state(&self) -> StageState {
        if self.running.load(Ordering::Acquire) {
            StageState::Running
        } else {
            StageState::Idle
        }
    }
}

/// Held while a stage runs; returns the stage to Idle on drop.
#[derive(Debug)]
pub struct RunningStage<'a> {
    guard: &'a StageGuard,
}

impl Drop for RunningStage<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// What a single stage tick did.
#[derive(Debug)]
pub struct TickReport {
    pub resolution: Resolution,
    pub window: BucketRange,
    /// The previous run of this stage was still in progress.
    pub skipped: bool,
    pub outcomes: Vec<(MetricKind, Result<StageOutcome>)>,
}

impl TickReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn rows_written(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(|o| o.rows_written)
            .sum()
    }
}

struct Stage {
    aggregator: Arc<dyn WindowAggregator>,
    guard: StageGuard,
    /// End of the latest window this stage finished, `i64::MIN` before the first run.
    completed: watch::Sender<i64>,
}

/// Drives the minute, hour and day aggregators.
pub struct RollupScheduler {
    config: SchedulerConfig,
    store: Arc<dyn MetricStore>,
    minute: Stage,
    hour: Stage,
    day: Stage,
}

impl RollupScheduler {
    pub fn new(config: SchedulerConfig, store: Arc<dyn MetricStore>) -> Self {
        let stage = |resolution| Stage {
            aggregator: aggregator_for(resolution, store.clone()),
            guard: StageGuard::new(),
            completed: watch::channel(i64::MIN).0,
        };
        Self {
            minute: stage(Resolution::Minute),
            hour: stage(Resolution::Hour),
            day: stage(Resolution::Day),
            config,
            store,
        }
    }

    fn stage(&self, resolution: Resolution) -> &Stage {
        match resolution {
            Resolution::Minute => &self.minute,
            Resolution::Hour => &self.hour,
            Resolution::Day => &self.day,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self, resolution: Resolution) -> StageState {
        self.stage(resolution).guard.state()
    }

    /// Starts the boundary timer.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        for resolution in Resolution::ALL {
            if !self.config.is_enabled(resolution) {
                info!(resolution = %resolution, "Rollup stage disabled");
            }
        }

        health().scheduler.set_healthy();
        info!("Rollup scheduler started");
        tokio::spawn(self.run_timer())
    }

    async fn run_timer(self: Arc<Self>) {
        let window_ms = Resolution::Minute.window_ms();

        loop {
            let now = Utc::now().timestamp_millis();
            tokio::time::sleep(delay_until_next_boundary(now, window_ms)).await;

            // The run targets the boundary it was scheduled for, so a timer
            // that wakes slightly early or late still closes the same windows.
            let boundary = align_down(now, window_ms) + window_ms;
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_boundary(boundary).await;
            });
        }
    }

    /// Run every enabled stage whose window closes at `boundary`, minute
    /// first, then hour, then day.
    pub async fn run_boundary(&self, boundary: i64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for resolution in Resolution::ALL {
            if resolution.bucket_of(boundary) != boundary {
                break;
            }
            if self.config.is_enabled(resolution) {
                reports.push(self.tick(resolution, boundary).await);
            }
        }
        reports
    }

    /// Wait until the finer stage has finished the window ending at
    /// `boundary`, if it is live and due to. Gives up after one finer window.
    async fn await_finer(&self, resolution: Resolution, boundary: i64) {
        let Some(finer) = resolution.finer() else {
            return;
        };
        if !self.config.is_enabled(finer) {
            return;
        }

        let mut completed = self.stage(finer).completed.subscribe();
        let last = *completed.borrow();
        if last != boundary - finer.window_ms() {
            return;
        }

        debug!(resolution = %resolution, boundary = boundary, "Waiting for {} stage", finer);
        let wait = Duration::from_millis(finer.window_ms() as u64);
        let closed = tokio::time::timeout(wait, completed.wait_for(|&end| end >= boundary))
            .await
            .map(|received| received.is_ok());
        if !matches!(closed, Ok(true)) {
            warn!(
                resolution = %resolution,
                boundary = boundary,
                "{} stage did not close the boundary, aggregating what is stored",
                finer
            );
        }
    }

    /// Run one stage for the window closed as of `now_ms`.
    pub async fn tick(&self, resolution: Resolution, now_ms: i64) -> TickReport {
        let stage = self.stage(resolution);
        let window = resolution.closed_window(now_ms);

        let Some(_running) = stage.guard.try_acquire() else {
            stage_metrics(resolution).skipped.inc();
            warn!(
                resolution = %resolution,
                window = %window,
                "Previous run still in progress, skipping tick"
            );
            return TickReport {
                resolution,
                window,
                skipped: true,
                outcomes: Vec::new(),
            };
        };

        self.await_finer(resolution, window.end).await;

        metrics().running_stages.inc();
        let start = Instant::now();

        let (requests, system) = tokio::join!(
            stage.aggregator.run(MetricKind::Request, now_ms),
            stage.aggregator.run(MetricKind::System, now_ms),
        );
        let outcomes = vec![(MetricKind::Request, requests), (MetricKind::System, system)];

        metrics().running_stages.dec();
        stage_metrics(resolution)
            .latency_ms
            .observe(start.elapsed().as_millis() as u64);

        let report = TickReport {
            resolution,
            window,
            skipped: false,
            outcomes,
        };
        self.record(&report);
        stage.completed.send_modify(|end| *end = (*end).max(window.end));

        if resolution == Resolution::Minute {
            info!(snapshot = ?metrics().snapshot(), "Rollup metrics");
        }

        report
    }

    fn record(&self, report: &TickReport) {
        let counters = stage_metrics(report.resolution);
        for (kind, result) in &report.outcomes {
            counters.runs.inc();
            match result {
                Ok(outcome) => {
                    counters.rows_upserted.inc_by(outcome.rows_written as u64);
                }
                Err(e) => {
                    counters.failures.inc();
                    error!(
                        resolution = %report.resolution,
                        kind = %kind,
                        window = %report.window,
                        error = %e,
                        "Rollup stage failed"
                    );
                }
            }
        }

        if report.failures() == 0 {
            health().scheduler.set_healthy();
        } else {
            health()
                .scheduler
                .set_unhealthy(format!("{} stage failed", report.resolution));
        }
    }

    /// Re-aggregate the last `catch_up_windows` closed minute windows, and the
    /// hours and days they close, before the timers start.
    ///
    /// Holds every stage guard for the duration. Returns `None` when catch-up
    /// is disabled or a stage is already running.
    pub async fn catch_up(&self, now_ms: i64) -> Option<Result<BackfillResult>> {
        if self.config.catch_up_windows == 0 {
            return None;
        }

        let _minute = self.minute.guard.try_acquire()?;
        let _hour = self.hour.guard.try_acquire()?;
        let _day = self.day.guard.try_acquire()?;

        let to = Resolution::Minute.closed_window(now_ms).end;
        let from = to - i64::from(self.config.catch_up_windows) * Resolution::Minute.window_ms();
        info!(from = from, to = to, "Catching up closed windows");

        let worker = BackfillWorker::new(self.store.clone());
        Some(worker.run(from, to, now_ms).await)
    }
}

/// Time from `now_ms` until the next multiple of `window_ms`.
///
/// Exactly on a boundary, waits a full window: that boundary's tick has
/// already been taken.
pub fn delay_until_next_boundary(now_ms: i64, window_ms: i64) -> Duration {
    let next = align_down(now_ms, window_ms) + window_ms;
    Duration::from_millis((next - now_ms) as u64)
}
