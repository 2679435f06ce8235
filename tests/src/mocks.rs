//! Mock implementations for testing.

use async_trait::async_trait;
use engine_core::{
    BucketRange, Error, MemoryStore, MetricStore, RawMetricEvent, RecentRawEvents,
    RequestAggregate, RequestEvent, Resolution, Result, ServiceKey, SystemAggregate, SystemEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Store that delegates to a [`MemoryStore`] and can be told to fail.
///
/// Implements the same `MetricStore` trait as the ClickHouse store, so
/// handlers and aggregators see failures exactly as they would from a
/// broken database.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<MemoryStore>,
    fail_writes: Arc<Mutex<bool>>,
    fail_reads: Arc<Mutex<bool>>,
    reachable: Arc<Mutex<bool>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            fail_writes: Arc::new(Mutex::new(false)),
            fail_reads: Arc::new(Mutex::new(false)),
            reachable: Arc::new(Mutex::new(true)),
        }
    }

    /// Underlying in-memory store.
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Fail every insert and upsert.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Fail every read.
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    /// Control the result of `ping`.
    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock() = reachable;
    }

    fn check_write(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(Error::write_failed("Mock store write failure"));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if *self.fail_reads.lock() {
            return Err(Error::read_failed("Mock store read failure"));
        }
        Ok(())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricStore for MockStore {
    async fn insert_raw(&self, event: RawMetricEvent) -> Result<()> {
        self.check_write()?;
        self.inner.insert_raw(event).await
    }

    async fn raw_requests(&self, range: BucketRange) -> Result<Vec<RequestEvent>> {
        self.check_read()?;
        self.inner.raw_requests(range).await
    }

    async fn raw_system(&self, range: BucketRange) -> Result<Vec<SystemEvent>> {
        self.check_read()?;
        self.inner.raw_system(range).await
    }

    async fn recent_raw(&self, limit: usize) -> Result<RecentRawEvents> {
        self.check_read()?;
        self.inner.recent_raw(limit).await
    }

    async fn request_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<RequestAggregate>> {
        self.check_read()?;
        self.inner.request_rows(resolution, range, service).await
    }

    async fn system_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<SystemAggregate>> {
        self.check_read()?;
        self.inner.system_rows(resolution, range, service).await
    }

    async fn upsert_request_rows(
        &self,
        resolution: Resolution,
        rows: Vec<RequestAggregate>,
    ) -> Result<usize> {
        self.check_write()?;
        self.inner.upsert_request_rows(resolution, rows).await
    }

    async fn upsert_system_rows(
        &self,
        resolution: Resolution,
        rows: Vec<SystemAggregate>,
    ) -> Result<usize> {
        self.check_write()?;
        self.inner.upsert_system_rows(resolution, rows).await
    }

    async fn ping(&self) -> bool {
        *self.reachable.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_failure_is_coded() {
        let store = MockStore::new();
        store.set_fail_writes(true);
        let event = RequestEvent::new("p", "s", 0, "GET", "/", 200, 1.0);
        let err = store.insert_raw(event.into()).await.unwrap_err();
        assert_eq!(err.error_code(), Some("DB_001"));
        assert_eq!(store.memory().raw_count(), 0);

        store.set_fail_writes(false);
        let event = RequestEvent::new("p", "s", 0, "GET", "/", 200, 1.0);
        store.insert_raw(event.into()).await.unwrap();
        assert_eq!(store.memory().raw_count(), 1);
    }
}
