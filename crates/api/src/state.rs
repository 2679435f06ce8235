//! Application state shared across handlers.

use engine_core::MetricStore;
use std::sync::Arc;

/// Source of the current time in epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Raw and aggregate storage (ClickHouse in production, memory in tests)
    pub store: Arc<dyn MetricStore>,
    clock: Clock,
}

impl AppState {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            store,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replace the wall clock, used by the overview's trailing windows.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now_ms(&self) -> i64 {
        (self.clock)()
    }
}
