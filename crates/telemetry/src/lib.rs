//! Internal telemetry for the rollup engine.
//!
//! Structured logging setup, in-process counters, and the component
//! health registry behind the `/health` endpoints.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
