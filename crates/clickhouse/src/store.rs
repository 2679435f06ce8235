//! [`MetricStore`] backed by ClickHouse.

use async_trait::async_trait;
use chrono::Utc;
use clickhouse::query::Query;
use clickhouse::Row;
use engine_core::{
    BucketRange, Error, MetricKind, MetricStore, RawMetricEvent, RecentRawEvents,
    RequestAggregate, RequestEvent, Resolution, Result, ServiceKey, SystemAggregate, SystemEvent,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Instant;
use telemetry::health;
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::health::check_connection;
use crate::rows::{RawRequestRow, RawSystemRow, RequestAggregateRow, SystemAggregateRow};
use crate::schema::{aggregate_table, RAW_REQUEST_TABLE, RAW_SYSTEM_TABLE};

const RAW_REQUEST_COLUMNS: &str =
    "project_id, service_name, timestamp, method, route, status_code, latency_ms, is_error";
const RAW_SYSTEM_COLUMNS: &str =
    "project_id, service_name, timestamp, cpu_usage_percent, memory_usage_mb";
const REQUEST_AGGREGATE_COLUMNS: &str = "project_id, service_name, route, method, bucket, \
     total_requests, success_count, client_error_count, server_error_count, \
     avg_response_time, max_response_time, p95_response_time, version";
const SYSTEM_AGGREGATE_COLUMNS: &str =
    "project_id, service_name, bucket, avg_cpu, max_cpu, avg_memory_mb, max_memory_mb, version";

/// ClickHouse store. Aggregate upserts rely on ReplacingMergeTree and reads
/// use `FINAL`, so a re-run stage is observed as a replacement.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn insert_rows<T>(&self, table: &str, rows: &[T]) -> Result<usize>
    where
        T: Row + Serialize,
    {
        if rows.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let mut insert = self
            .client
            .inner()
            .insert(table)
            .map_err(|e| write_error(table, e))?;
        for row in rows {
            insert.write(row).await.map_err(|e| write_error(table, e))?;
        }
        insert.end().await.map_err(|e| write_error(table, e))?;

        debug!(
            table = table,
            rows = rows.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Inserted rows into ClickHouse"
        );
        Ok(rows.len())
    }

    async fn fetch<T>(&self, table: &str, query: Query) -> Result<Vec<T>>
    where
        T: Row + DeserializeOwned,
    {
        query
            .fetch_all::<T>()
            .await
            .map_err(|e| read_error(table, e))
    }
}

fn write_error(table: &str, e: clickhouse::error::Error) -> Error {
    health().store.set_unhealthy(format!("write to {} failed", table));
    Error::write_failed(format!("ClickHouse insert into {} failed: {}", table, e))
}

fn read_error(table: &str, e: clickhouse::error::Error) -> Error {
    health().store.set_unhealthy(format!("read from {} failed", table));
    Error::read_failed(format!("ClickHouse read from {} failed: {}", table, e))
}

/// Row version for ReplacingMergeTree: later writes win.
fn next_version() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// `WHERE` clause over a DateTime64 column for `[start, end)` in epoch millis,
/// optionally narrowed to one service. Binds: start, end, then project and
/// service when present.
fn range_filter(column: &str, service: Option<&ServiceKey>) -> String {
    let mut clause = format!(
        "{column} >= fromUnixTimestamp64Milli(toInt64(?)) \
         AND {column} < fromUnixTimestamp64Milli(toInt64(?))"
    );
    if service.is_some() {
        clause.push_str(" AND project_id = ? AND service_name = ?");
    }
    clause
}

fn bind_range(mut query: Query, range: BucketRange, service: Option<&ServiceKey>) -> Query {
    query = query.bind(range.start).bind(range.end);
    if let Some(key) = service {
        query = query
            .bind(key.project_id.as_str())
            .bind(key.service_name.as_str());
    }
    query
}

#[async_trait]
impl MetricStore for ClickHouseStore {
    async fn insert_raw(&self, event: RawMetricEvent) -> Result<()> {
        match event {
            RawMetricEvent::Request(e) => {
                self.insert_rows(RAW_REQUEST_TABLE, &[RawRequestRow::from(e)])
                    .await?
            }
            RawMetricEvent::System(e) => {
                self.insert_rows(RAW_SYSTEM_TABLE, &[RawSystemRow::from(e)])
                    .await?
            }
        };
        Ok(())
    }

    async fn raw_requests(&self, range: BucketRange) -> Result<Vec<RequestEvent>> {
        let sql = format!(
            "SELECT {RAW_REQUEST_COLUMNS} FROM {RAW_REQUEST_TABLE} WHERE {} ORDER BY timestamp",
            range_filter("timestamp", None)
        );
        let query = bind_range(self.client.inner().query(&sql), range, None);
        let rows: Vec<RawRequestRow> = self.fetch(RAW_REQUEST_TABLE, query).await?;
        Ok(rows.into_iter().map(RequestEvent::from).collect())
    }

    async fn raw_system(&self, range: BucketRange) -> Result<Vec<SystemEvent>> {
        let sql = format!(
            "SELECT {RAW_SYSTEM_COLUMNS} FROM {RAW_SYSTEM_TABLE} WHERE {} ORDER BY timestamp",
            range_filter("timestamp", None)
        );
        let query = bind_range(self.client.inner().query(&sql), range, None);
        let rows: Vec<RawSystemRow> = self.fetch(RAW_SYSTEM_TABLE, query).await?;
        Ok(rows.into_iter().map(SystemEvent::from).collect())
    }

    async fn recent_raw(&self, limit: usize) -> Result<RecentRawEvents> {
        let limit = limit as u64;

        let sql = format!(
            "SELECT {RAW_REQUEST_COLUMNS} FROM {RAW_REQUEST_TABLE} \
             ORDER BY received_at DESC LIMIT ?"
        );
        let query = self.client.inner().query(&sql).bind(limit);
        let requests: Vec<RawRequestRow> = self.fetch(RAW_REQUEST_TABLE, query).await?;

        let sql = format!(
            "SELECT {RAW_SYSTEM_COLUMNS} FROM {RAW_SYSTEM_TABLE} ORDER BY received_at DESC LIMIT ?"
        );
        let query = self.client.inner().query(&sql).bind(limit);
        let system: Vec<RawSystemRow> = self.fetch(RAW_SYSTEM_TABLE, query).await?;

        Ok(RecentRawEvents {
            request_metrics: requests.into_iter().map(RequestEvent::from).collect(),
            system_metrics: system.into_iter().map(SystemEvent::from).collect(),
        })
    }

    async fn request_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<RequestAggregate>> {
        let table = aggregate_table(MetricKind::Request, resolution);
        let sql = format!(
            "SELECT {REQUEST_AGGREGATE_COLUMNS} FROM {table} FINAL WHERE {} ORDER BY bucket",
            range_filter("bucket", service)
        );
        let query = bind_range(self.client.inner().query(&sql), range, service);
        let rows: Vec<RequestAggregateRow> = self.fetch(table, query).await?;
        Ok(rows.into_iter().map(RequestAggregate::from).collect())
    }

    async fn system_rows(
        &self,
        resolution: Resolution,
        range: BucketRange,
        service: Option<&ServiceKey>,
    ) -> Result<Vec<SystemAggregate>> {
        let table = aggregate_table(MetricKind::System, resolution);
        let sql = format!(
            "SELECT {SYSTEM_AGGREGATE_COLUMNS} FROM {table} FINAL WHERE {} ORDER BY bucket",
            range_filter("bucket", service)
        );
        let query = bind_range(self.client.inner().query(&sql), range, service);
        let rows: Vec<SystemAggregateRow> = self.fetch(table, query).await?;
        Ok(rows.into_iter().map(SystemAggregate::from).collect())
    }

    async fn upsert_request_rows(
        &self,
        resolution: Resolution,
        rows: Vec<RequestAggregate>,
    ) -> Result<usize> {
        let version = next_version();
        let rows: Vec<RequestAggregateRow> = rows
            .into_iter()
            .map(|row| RequestAggregateRow::new(row, version))
            .collect();
        self.insert_rows(aggregate_table(MetricKind::Request, resolution), &rows)
            .await
    }

    async fn upsert_system_rows(
        &self,
        resolution: Resolution,
        rows: Vec<SystemAggregate>,
    ) -> Result<usize> {
        let version = next_version();
        let rows: Vec<SystemAggregateRow> = rows
            .into_iter()
            .map(|row| SystemAggregateRow::new(row, version))
            .collect();
        self.insert_rows(aggregate_table(MetricKind::System, resolution), &rows)
            .await
    }

    async fn ping(&self) -> bool {
        let healthy = check_connection(&self.client).await;
        if healthy {
            health().store.set_healthy();
        } else {
            health().store.set_unhealthy("ClickHouse unreachable");
        }
        healthy
    }
}
