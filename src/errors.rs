// src/errors.rs
//! Error taxonomy for the ingest pipeline.
//!
//! Per-source failures (`FetchError`, `ParseError`, wrapped as `SourceError`) are
//! absorbed by the orchestrator and turned into empty contributions. Only `RunError`
//! reaches the caller, as the terminal error of a run.

use thiserror::Error;

/// One failed attempt, or the whole candidate chain for a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("attempt timed out after {0} ms")]
    Timeout(u64),

    #[error("empty payload")]
    EmptyBody,

    #[error("all {attempts} candidates failed for {resource}")]
    Exhausted { resource: String, attempts: usize },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// The top-level document of a source could not be parsed at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("xml feed parse error: {0}")]
    Xml(String),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for ParseError {
    fn from(err: quick_xml::Error) -> Self {
        ParseError::Xml(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("source task aborted: {0}")]
    Task(String),
}

/// Run-level failure, unrelated to any individual source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("unsupported day window: {0} (expected one of 7, 30, 90, 180, 365)")]
    InvalidDayWindow(u32),

    #[error("duplicate source id in registry: {0}")]
    DuplicateSourceId(String),

    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}
