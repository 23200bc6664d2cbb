//! The time-windowed statistics refresh pipeline.
//!
//! 1. [`DateRangeResolver`] finds the dataset's first and last week.
//! 2. [`TimeWindowController`] owns the slider position inside that extent.
//! 3. [`Orchestrator`] wires both to the statistics fetcher and formatter and
//!    keeps the panel in sync with every committed window or viewport change.

pub mod controller;
pub mod orchestrator;
pub mod resolver;

pub use controller::{Playback, PlaybackEnd, TimeSliderConfig, TimeWindowController, WindowUpdate};
pub use orchestrator::{Orchestrator, OrchestratorState, Session};
pub use resolver::DateRangeResolver;
