//! Shared harness for end-to-end tests over the HTTP router.

pub mod fixtures;
pub mod mocks;
pub mod setup;
