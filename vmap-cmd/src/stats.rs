//! `stats`: the statistics panel for a single week.

use crate::source::SourceArgs;
use anyhow::anyhow;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;
use vmap_core::display::StatsDisplay;
use vmap_core::geometry::Geometry;
use vmap_core::query::QueryFilter;
use vmap_core::service::DEFAULT_DATE_FIELD;
use vmap_core::traits::FeatureSource;
use vmap_stats::fields::{vaccination_spec, VACCINATION_FIELDS};
use vmap_stats::{format_outcome, render_html, StatsFetcher, StatsOutcome};
use vmap_timeline::{DateRangeResolver, TimeSliderConfig, TimeWindowController};

pub async fn run_stats(
    source: &SourceArgs,
    date: Option<NaiveDate>,
    bbox: Geometry,
    html: bool,
) -> anyhow::Result<()> {
    let source = source.open().await?;
    let display = week_stats(source, date, bbox).await?;
    if html {
        println!("{}", render_html(&display));
    } else {
        for line in display.to_text_lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Panel content for the week nearest `date` (or the latest week) within
/// `bbox`. Dates outside the dataset are clamped like a slider would be.
pub async fn week_stats(
    source: Arc<dyn FeatureSource>,
    date: Option<NaiveDate>,
    bbox: Geometry,
) -> anyhow::Result<StatsDisplay> {
    let extent = DateRangeResolver::new(source.clone(), DEFAULT_DATE_FIELD)
        .resolve()
        .await?;
    let controller = TimeWindowController::new(extent, TimeSliderConfig::default());
    if let Some(date) = date {
        controller.set_instant(date);
    }
    let filter = QueryFilter::new(controller.current(), bbox);
    info!(
        "[VMAP] stats: week {} within {}",
        filter.time_window, filter.geometry
    );

    let fetcher = StatsFetcher::new(source, DEFAULT_DATE_FIELD, vaccination_spec());
    let outcome = fetcher.fetch(&filter).await;
    if let StatsOutcome::Failed(e) = &outcome {
        return Err(anyhow!("statistics query failed: {}", e));
    }
    format_outcome(&outcome, &VACCINATION_FIELDS)
        .ok_or_else(|| anyhow!("no statistics for {}", filter.time_window))
}
