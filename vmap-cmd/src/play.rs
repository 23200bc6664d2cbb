//! `play`: animate the slider across the whole dataset.

use crate::console::{ConsoleMap, ConsolePanel};
use crate::source::SourceArgs;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use vmap_core::geometry::Geometry;
use vmap_core::traits::{DisplaySurface, FeatureSource};
use vmap_timeline::{Orchestrator, PlaybackEnd, TimeSliderConfig};

pub async fn run_play(source: &SourceArgs, bbox: Geometry, rate_ms: u64) -> anyhow::Result<()> {
    let source = source.open().await?;
    let rate = Duration::from_millis(rate_ms.max(1));
    play_through(source, bbox, rate, Arc::new(ConsolePanel::stdout())).await?;
    Ok(())
}

/// Play from the first week to the last and wait for the final week's panel.
/// Weeks whose refresh is overtaken by the next step are not shown.
pub async fn play_through(
    source: Arc<dyn FeatureSource>,
    bbox: Geometry,
    rate: Duration,
    panel: Arc<dyn DisplaySurface>,
) -> anyhow::Result<PlaybackEnd> {
    let slider = TimeSliderConfig {
        play_rate: rate,
        ..TimeSliderConfig::default()
    };
    let mut orchestrator = Orchestrator::new(source, Arc::new(ConsoleMap::new(bbox)), panel)
        .with_slider_config(slider);

    let session = orchestrator.start().await?;
    let end = session.controller().play().join().await;
    session.settled().await;
    info!(
        "[VMAP] play: {:?} at {}",
        end,
        session.controller().current()
    );
    session.shutdown().await;
    Ok(end)
}
