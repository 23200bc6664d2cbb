//! Command implementations for the vaccination map CLI.
//!
//! Every command runs against either a local observations CSV (loaded into
//! in-memory SQLite) or the remote feature service.

use chrono::NaiveDate;
use clap::Subcommand;
use vmap_core::geometry::Geometry;
use vmap_utils::dates::parse_date;

pub mod console;
pub mod extent;
pub mod play;
pub mod source;
pub mod stats;

pub use source::SourceArgs;

#[derive(Subcommand)]
pub enum Command {
    /// Print the first and last week of the dataset
    Extent {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the statistics panel for one week
    Stats {
        #[command(flatten)]
        source: SourceArgs,

        /// Week to report (YYYY-MM-DD); defaults to the latest week
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Viewport as xmin,ymin,xmax,ymax in degrees
        #[arg(short, long, default_value_t = Geometry::WORLD, allow_hyphen_values = true)]
        bbox: Geometry,

        /// Print the panel's HTML markup instead of plain lines
        #[arg(long)]
        html: bool,
    },

    /// Play the time slider from the first week to the last, printing the panel as it refreshes
    Play {
        #[command(flatten)]
        source: SourceArgs,

        /// Viewport as xmin,ymin,xmax,ymax in degrees
        #[arg(short, long, default_value_t = Geometry::WORLD, allow_hyphen_values = true)]
        bbox: Geometry,

        /// Milliseconds between weeks
        #[arg(long, default_value_t = 500)]
        rate_ms: u64,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Extent { source } => extent::run_extent(&source).await,
        Command::Stats {
            source,
            date,
            bbox,
            html,
        } => stats::run_stats(&source, date, bbox, html).await,
        Command::Play {
            source,
            bbox,
            rate_ms,
        } => play::run_play(&source, bbox, rate_ms).await,
    }
}
