//! In-memory [`MetricStore`].
//!
//! Raw events are kept in arrival order with a timestamp index, so a window
//! read touches only the events inside it. Aggregate tables are ordered maps
//! keyed by (bucket, grouping key) so range reads come out sorted by bucket.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

use crate::aggregate::{RequestAggregate, RequestKey, ServiceKey, SystemAggregate};
use crate::error::Result;
use crate::events::{RawMetricEvent, RequestEvent, SystemEvent};
use crate::store::{MetricStore, RecentRawEvents};
use crate::window::{BucketRange, Resolution};

type RequestTable = BTreeMap<(i64, RequestKey), RequestAggregate>;
type SystemTable = BTreeMap<(i64, ServiceKey), SystemAggregate>;

#[derive(Default)]
struct Tables {
    minute: (RequestTable, SystemTable),
    hour: (RequestTable, SystemTable),
    day: (RequestTable, SystemTable),
}

impl Tables {
    fn get(&self, resolution: Resolution) -> &(RequestTable, SystemTable) {
        match resolution {
            Resolution::Minute => &self.minute,
            Resolution::Hour => &self.hour,
            Resolution::Day => &self.day,
        }
    }

    fn get_mut(&mut self, resolution: Resolution) -> &mut (RequestTable, SystemTable) {
        match resolution {
            Resolution::Minute => &mut self.minute,
            Resolution::Hour => &mut self.hour,
            Resolution::Day => &mut self.day,
        }
    }
}

/// Append-only raw events with a timestamp index into arrival order.
struct RawLog<T> {
    events: Vec<T>,
    by_time: BTreeMap<i64, Vec<usize>>,
}

impl<T: Clone> RawLog<T> {
    fn push(&mut self, timestamp: i64, event: T) {
        self.by_time.entry(timestamp).or_default().push(self.events.len());
        self.events.push(event);
    }

    /// Events with `range.start <= timestamp < range.end`, by timestamp.
    fn window(&self, range: BucketRange) -> Vec<T> {
        if range.is_empty() {
            return Vec::new();
        }
        self.by_time
            .range(range.start..range.end)
            .flat_map(|(_, indices)| indices.iter().map(|&i| self.events[i].clone()))
            .collect()
    }

    fn newest(&self, limit: usize) -> Vec<T> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for RawLog<T> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            by_time: BTreeMap::new(),
        }
    }
}

/// Process-local store backed by ordered maps.
#[derive(Default)]
pub struct MemoryStore {
    raw_requests: RwLock<RawLog<RequestEvent>>,
    raw_system: RwLock<RawLog<SystemEvent>>,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held for a resolution, request and system combined.
    pub fn row_count(&self, resolution: Resolution) -> usize {
        let tables = self.tables.read();
        let (requests, system) = tables.get(resolution);
        requests.len() + system.len()
    }

    /// Number of raw events held, both kinds.
    pub fn raw_count(&self) -> usize {
        self.raw_requests.read().len() + self.raw_system.read().len()
    }
}

fn in_service(service: Option<&ServiceKey>, project_id: &str, service_name: &str) -> bool {
    service.map_or(true, |key| key.matches(project_id, service_name))
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn insert_raw(&self, event: RawMetricEvent) -> Result<()> {
        match event {
            RawMetricEvent::Request(e) => self.raw_requests.write().push(e.timestamp, e),
            RawMetricEvent::System(e) => self.raw_system.write().push(e.timestamp, e),
        }
        Ok(())
    }

    async fn raw_requests(&self, range: BucketRange) -> Result<Vec<RequestEvent>> {
        Ok(self.raw_requests.read().window(range))
    }

    async fn raw_system(&self, range: BucketRange) -> Result<Vec<SystemEvent>> {
        Ok(self.raw_system.read().window(range))
    }

    async fn recent_raw(&self, limit: usize) -> Result<RecentRawEvents> {
        Ok(RecentRawEvents {
            request_metrics: self.raw_requests.read().newest(limit),
            system_metrics: self.raw_system.read().newest(limit),
        })
    }

    async fn request_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<RequestAggregate>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.tables.read();
        let (requests, _) = tables.get(resolution);
        Ok(requests
            .range((range.start, RequestKey::lowest())..)
            .take_while(|((bucket, _), _)| *bucket < range.end)
            .map(|(_, row)| row)
            .filter(|row| in_service(service, &row.project_id, &row.service_name))
            .cloned()
            .collect())
    }

    async fn system_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<SystemAggregate>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.tables.read();
        let (_, system) = tables.get(resolution);
        Ok(system
            .range((range.start, ServiceKey::new("", ""))..)
            .take_while(|((bucket, _), _)| *bucket < range.end)
            .map(|(_, row)| row)
            .filter(|row| in_service(service, &row.project_id, &row.service_name))
            .cloned()
            .collect())
    }

    async fn upsert_request_rows(
        &self,
        resolution: Resolution,
        rows: Vec<RequestAggregate>,
    ) -> Result<usize> {
        let written = rows.len();
        let mut tables = self.tables.write();
        let (requests, _) = tables.get_mut(resolution);
        for row in rows {
            requests.insert((row.bucket, row.key()), row);
        }
        debug!(resolution = %resolution, rows = written, "Upserted request rows");
        Ok(written)
    }

    async fn upsert_system_rows(
        &self,
        resolution: Resolution,
        rows: Vec<SystemAggregate>,
    ) -> Result<usize> {
        let written = rows.len();
        let mut tables = self.tables.write();
        let (_, system) = tables.get_mut(resolution);
        for row in rows {
            system.insert((row.bucket, row.key()), row);
        }
        debug!(resolution = %resolution, rows = written, "Upserted system rows");
        Ok(written)
    }
}

impl RequestKey {
    /// Smallest possible key, used as a range lower bound.
    fn lowest() -> Self {
        Self {
            project_id: String::new(),
            service_name: String::new(),
            route: String::new(),
            method: String::new(),
        }
    }
}
