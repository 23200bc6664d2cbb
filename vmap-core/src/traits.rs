//! Collaborators the pipeline talks to: the queryable dataset, the map view
//! and the statistics display surface.

use crate::display::StatsDisplay;
use crate::error::QueryError;
use crate::geometry::Geometry;
use crate::query::{QueryFilter, StatisticsQuery, TopFeaturesQuery};
use crate::stats_record::StatsRecord;
use crate::time_extent::{TimeExtent, TimeWindow};
use async_trait::async_trait;
use chrono::NaiveDate;

/// A remote or local dataset of weekly per-country features.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Distinct values of the query's date field, ordered and limited as requested.
    async fn query_top_features(
        &self,
        query: &TopFeaturesQuery,
    ) -> Result<Vec<NaiveDate>, QueryError>;

    /// Aggregate rows for the filter. An empty vector means no row matched.
    async fn query_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<StatsRecord>, QueryError>;
}

/// The rendered map.
pub trait MapView: Send + Sync {
    /// Current viewport.
    fn extent(&self) -> Geometry;

    /// Scope the rendered features to `filter` (highlight/feature effect).
    fn apply_feature_effect(&self, filter: &QueryFilter);

    /// Show the time slider bounded by `extent`, positioned at `window`.
    fn mount_time_slider(&self, extent: &TimeExtent, window: &TimeWindow);
}

/// Panel presenting the formatted statistics.
pub trait DisplaySurface: Send + Sync {
    fn show(&self, display: &StatsDisplay);
}
