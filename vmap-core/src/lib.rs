//! Core types for the vaccination map statistics pipeline.
//!
//! - `time_extent`: the resolved [`TimeExtent`](time_extent::TimeExtent) and the
//!   selected [`TimeWindow`](time_extent::TimeWindow)
//! - `date_range`: stepping over slider stops inside an extent
//! - `geometry`: viewport envelopes
//! - `query`: top-feature and statistics query descriptions
//! - `traits`: the dataset, map view and display surface collaborators
//! - `service`: feature-service wire format (and client with the `api` feature)

pub mod date_range;
pub mod display;
pub mod error;
pub mod geometry;
pub mod query;
pub mod service;
pub mod stats_record;
pub mod time_extent;
pub mod traits;
