//! Statistics panel logic for the vaccination map.
//!
//! - `fields`: the static aggregate spec and display table
//! - `fetcher`: one best-effort aggregate query per filter
//! - `formatter`: turning a result into panel lines or a fallback message

pub mod fetcher;
pub mod fields;
pub mod formatter;

pub use fetcher::{StatsFetcher, StatsOutcome};
pub use formatter::{format_outcome, format_record, render_html};
