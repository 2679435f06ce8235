//! Read path for the rollup engine.
//!
//! Reads never touch raw events; they go to whichever aggregate table
//! matches the requested range.

pub mod overview;
pub mod resolution;

pub use overview::*;
pub use resolution::*;
