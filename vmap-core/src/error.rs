//! Error taxonomy for dataset queries and the statistics pipeline.

use crate::time_extent::TimeExtent;
use chrono::NaiveDate;
use thiserror::Error;

/// Failures reported by a [`FeatureSource`](crate::traits::FeatureSource) backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("feature service error {code}: {message}")]
    Service { code: i64, message: String },
    #[error("database error: {0}")]
    Database(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Errors surfaced by the time-window pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A boundary query returned no rows, so no extent can be built.
    #[error("no data found for date field `{field}`")]
    NoData { field: String },
    #[error("upstream query failed: {0}")]
    UpstreamQuery(#[from] QueryError),
    #[error("{requested} is outside the time extent {extent}")]
    Range {
        requested: NaiveDate,
        extent: TimeExtent,
    },
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidExtent { start: NaiveDate, end: NaiveDate },
    #[error("orchestrator cannot start from state {0}")]
    InvalidState(String),
}
