//! Core types, rollup math, and store contract for the metrics rollup engine.

pub mod aggregate;
pub mod error;
pub mod events;
pub mod memory_store;
pub mod payload;
pub mod stats;
pub mod store;
pub mod window;

pub use aggregate::*;
pub use error::{Error, Result};
pub use events::*;
pub use memory_store::MemoryStore;
pub use payload::MetricPayload;
pub use store::{MetricStore, RecentRawEvents};
pub use window::*;
