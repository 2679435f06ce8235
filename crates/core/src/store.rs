//! Store contract for raw events and aggregate tables.
//!
//! Implementations must provide range reads over `[start, end)` and an
//! idempotent upsert keyed by (grouping key, bucket). Nothing else is
//! assumed about the storage technology.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::aggregate::{RequestAggregate, ServiceKey, SystemAggregate};
use crate::error::Result;
use crate::events::{RawMetricEvent, RequestEvent, SystemEvent};
use crate::window::{BucketRange, Resolution};

/// Most recently received raw events, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRawEvents {
    pub request_metrics: Vec<RequestEvent>,
    pub system_metrics: Vec<SystemEvent>,
}

#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Persist one validated raw event.
    async fn insert_raw(&self, event: RawMetricEvent) -> Result<()>;

    /// Raw request events with `timestamp` in `range`.
    async fn raw_requests(&self, range: BucketRange) -> Result<Vec<RequestEvent>>;

    /// Raw system events with `timestamp` in `range`.
    async fn raw_system(&self, range: BucketRange) -> Result<Vec<SystemEvent>>;

    /// Up to `limit` most recently received raw events of each kind.
    async fn recent_raw(&self, limit: usize) -> Result<RecentRawEvents>;

    /// Request rows of `resolution` with `bucket` in `range`, ascending by bucket.
    async fn request_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<RequestAggregate>>;

    /// System rows of `resolution` with `bucket` in `range`, ascending by bucket.
    async fn system_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<SystemAggregate>>;

    /// Replace-or-insert request rows by (grouping key, bucket). Returns rows written.
    async fn upsert_request_rows(
        &self,
        resolution: Resolution,
        rows: Vec<RequestAggregate>,
    ) -> Result<usize>;

    /// Replace-or-insert system rows by (grouping key, bucket). Returns rows written.
    async fn upsert_system_rows(
        &self,
        resolution: Resolution,
        rows: Vec<SystemAggregate>,
    ) -> Result<usize>;

    /// Cheap liveness probe.
    async fn ping(&self) -> bool {
        true
    }
}
