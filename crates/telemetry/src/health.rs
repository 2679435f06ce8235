//! Component health for the rollup engine.
//!
//! Two components are tracked: the metric store and the rollup scheduler.
//! Reads and collection need the store, so a failing store makes the whole
//! service unhealthy. A failing scheduler only stalls rollups and leaves the
//! service degraded.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::LazyLock;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Health of one component, updated from whichever task last touched it.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    consecutive_failures: AtomicU64,
    /// Unix millis of the last healthy/unhealthy transition, 0 if never set.
    changed_at: AtomicI64,
    message: RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            consecutive_failures: AtomicU64::new(0),
            changed_at: AtomicI64::new(0),
            message: RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        if !self.healthy.swap(true, Ordering::Relaxed) {
            self.changed_at.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.message.write() = None;
    }

    /// Mark unhealthy and count the failure.
    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        if self.healthy.swap(false, Ordering::Relaxed) {
            self.changed_at.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn snapshot(&self) -> ComponentReport {
        let changed_at = self.changed_at.load(Ordering::Relaxed);
        ComponentReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            consecutive_failures: self.consecutive_failures(),
            changed_at: (changed_at > 0).then_some(changed_at),
            message: self.message(),
        }
    }
}

/// Point-in-time view of every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub name: String,
    pub healthy: bool,
    pub consecutive_failures: u64,
    pub changed_at: Option<i64>,
    pub message: Option<String>,
}

/// Process-wide health registry.
pub struct HealthRegistry {
    pub store: ComponentHealth,
    pub scheduler: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            store: ComponentHealth::new("store"),
            scheduler: ComponentHealth::new("scheduler"),
        }
    }

    pub fn status(&self) -> HealthStatus {
        if !self.store.is_healthy() {
            HealthStatus::Unhealthy
        } else if !self.scheduler.is_healthy() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            status: self.status(),
            components: vec![self.store.snapshot(), self.scheduler.snapshot()],
        }
    }

    /// Collection and reads can be served.
    pub fn is_ready(&self) -> bool {
        self.status().is_serving()
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static HEALTH: LazyLock<HealthRegistry> = LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
