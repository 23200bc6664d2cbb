//! Best-effort aggregate statistics for a query filter.

use log::{error, info};
use std::sync::Arc;
use vmap_core::error::QueryError;
use vmap_core::query::{AggregateSpec, QueryFilter, StatisticsQuery};
use vmap_core::stats_record::StatsRecord;
use vmap_core::traits::FeatureSource;

/// Result of one statistics fetch. Failures are data, not `Err`: the panel
/// is supplementary and must never take the map down with it.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome {
    /// First row of the aggregate result.
    Record(StatsRecord),
    /// The filter matched no rows.
    NoMatch,
    /// The query failed; already logged.
    Failed(QueryError),
}

/// Issues the statistics query for a filter against a fixed [`AggregateSpec`].
#[derive(Clone)]
pub struct StatsFetcher {
    source: Arc<dyn FeatureSource>,
    date_field: String,
    spec: AggregateSpec,
}

impl StatsFetcher {
    pub fn new(source: Arc<dyn FeatureSource>, date_field: &str, spec: AggregateSpec) -> Self {
        Self {
            source,
            date_field: date_field.to_string(),
            spec,
        }
    }

    /// The query issued for `filter`.
    pub fn query_for(&self, filter: &QueryFilter) -> StatisticsQuery {
        StatisticsQuery {
            filter: *filter,
            date_field: self.date_field.clone(),
            statistics: self.spec.clone(),
        }
    }

    pub async fn fetch(&self, filter: &QueryFilter) -> StatsOutcome {
        let query = self.query_for(filter);
        match self.source.query_statistics(&query).await {
            Ok(records) => match records.into_iter().next() {
                Some(record) => StatsOutcome::Record(record),
                None => {
                    info!("[VMAP] stats: no rows for {}", query);
                    StatsOutcome::NoMatch
                }
            },
            Err(e) => {
                error!("[VMAP] stats: query for {} failed: {}", query, e);
                StatsOutcome::Failed(e)
            }
        }
    }
}
