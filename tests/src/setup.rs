//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use axum_test::TestServer;
use engine_core::{MetricStore, Resolution};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use worker::{BackfillResult, BackfillWorker, RollupScheduler, SchedulerConfig, TickReport};

use crate::fixtures::{DAY_START, PROJECT_ID};
use crate::mocks::MockStore;

/// Test context with the real router over an in-memory store.
///
/// This exercises the same production code paths by:
/// - Using the real Axum router with all layers
/// - Using MockStore, which implements the MetricStore trait
/// - Driving the real RollupScheduler tick by tick instead of by timers
pub struct TestContext {
    pub store: Arc<MockStore>,
    pub scheduler: RollupScheduler,
    pub router: Router,
    clock: Arc<AtomicI64>,
}

impl TestContext {
    /// Create a new test context with the clock at the start of the test day.
    pub fn new() -> Self {
        let store = Arc::new(MockStore::new());
        let clock = Arc::new(AtomicI64::new(DAY_START));

        let reader = clock.clone();
        let state = AppState::new(store.clone() as Arc<dyn MetricStore>)
            .with_clock(move || reader.load(Ordering::SeqCst));

        let scheduler = RollupScheduler::new(
            SchedulerConfig::default(),
            store.clone() as Arc<dyn MetricStore>,
        );

        Self {
            store,
            scheduler,
            router: router(state),
            clock,
        }
    }

    /// Test server over the router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// Set the clock seen by the overview endpoint.
    pub fn set_now(&self, now_ms: i64) {
        self.clock.store(now_ms, Ordering::SeqCst);
    }

    /// POST each payload to /collect under the default project.
    pub async fn collect_all(&self, server: &TestServer, payloads: &[Value]) {
        for payload in payloads {
            server
                .post("/collect")
                .add_header("X-Project-Id", PROJECT_ID)
                .json(payload)
                .await
                .assert_status_ok();
        }
    }

    /// Run one stage as of `now_ms`.
    pub async fn tick(&self, resolution: Resolution, now_ms: i64) -> TickReport {
        self.scheduler.tick(resolution, now_ms).await
    }

    /// Run every stage that closes at `boundary`, as the timer does.
    pub async fn run_boundary(&self, boundary: i64) -> Vec<TickReport> {
        self.scheduler.run_boundary(boundary).await
    }

    /// Re-aggregate `[from, to)` as of `now_ms`.
    pub async fn backfill(&self, from: i64, to: i64, now_ms: i64) -> BackfillResult {
        BackfillWorker::new(self.store.clone() as Arc<dyn MetricStore>)
            .run(from, to, now_ms)
            .await
            .expect("Backfill failed")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
