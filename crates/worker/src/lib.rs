//! Background rollup workers.
//!
//! - Minute aggregator (raw events → minute rows)
//! - Hour and day aggregators (finer rows → coarser rows)
//! - Scheduler (closed-window ticks per stage, skip-if-running guard)
//! - Backfill (idempotent re-aggregation over a historical range)

pub mod aggregator;
pub mod backfill;
pub mod scheduler;

pub use aggregator::*;
pub use backfill::{BackfillResult, BackfillWorker};
pub use scheduler::*;
