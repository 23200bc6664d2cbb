//! Discovery of the full time extent from the dataset itself.

use log::info;
use std::sync::Arc;
use vmap_core::error::{PipelineError, QueryError};
use vmap_core::query::TopFeaturesQuery;
use vmap_core::time_extent::TimeExtent;
use vmap_core::traits::FeatureSource;

pub struct DateRangeResolver {
    source: Arc<dyn FeatureSource>,
    date_field: String,
}

impl DateRangeResolver {
    pub fn new(source: Arc<dyn FeatureSource>, date_field: &str) -> Self {
        Self {
            source,
            date_field: date_field.to_string(),
        }
    }

    /// Earliest and latest distinct value of the date field, as an extent.
    ///
    /// Both top-1 queries run concurrently and must both succeed. An empty
    /// answer is [`PipelineError::NoData`]; a failed query is
    /// [`PipelineError::UpstreamQuery`]. No retries.
    pub async fn resolve(&self) -> Result<TimeExtent, PipelineError> {
        let earliest = TopFeaturesQuery::earliest(&self.date_field);
        let latest = TopFeaturesQuery::latest(&self.date_field);
        let (first, last) = tokio::try_join!(
            self.source.query_top_features(&earliest),
            self.source.query_top_features(&latest)
        )?;

        let no_data = || PipelineError::NoData {
            field: self.date_field.clone(),
        };
        let start = first.first().copied().ok_or_else(no_data)?;
        let end = last.first().copied().ok_or_else(no_data)?;
        let extent = TimeExtent::new(start, end).map_err(|_| {
            PipelineError::UpstreamQuery(QueryError::Decode(format!(
                "earliest {} ({}) is after latest ({})",
                self.date_field, start, end
            )))
        })?;
        info!("[VMAP] resolver: {} spans {}", self.date_field, extent);
        Ok(extent)
    }
}
