// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod metrics;

pub use crate::api::{router, AppState};
pub use crate::ingest::pipeline::{Pipeline, RunConfig, RunEvent, RunOutcome, RunState};
pub use crate::ingest::registry::SourceRegistry;
