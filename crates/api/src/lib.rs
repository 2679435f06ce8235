//! HTTP surface for the rollup engine: metric collection, resolution-switching
//! series reads, the service overview and health probes.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
