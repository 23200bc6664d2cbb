//! [`FeatureSource`] implementation over the SQLite feature table.

use crate::Database;
use async_trait::async_trait;
use chrono::NaiveDate;
use vmap_core::error::QueryError;
use vmap_core::query::{StatisticsQuery, TopFeaturesQuery};
use vmap_core::stats_record::StatsRecord;
use vmap_core::traits::FeatureSource;

/// Keep typed query errors; anything else (SQLite, locking) is a database error.
fn into_query_error(error: anyhow::Error) -> QueryError {
    match error.downcast::<QueryError>() {
        Ok(query_error) => query_error,
        Err(other) => QueryError::Database(format!("{:#}", other)),
    }
}

#[async_trait]
impl FeatureSource for Database {
    async fn query_top_features(
        &self,
        query: &TopFeaturesQuery,
    ) -> Result<Vec<NaiveDate>, QueryError> {
        self.query_top_dates(query).map_err(into_query_error)
    }

    async fn query_statistics(
        &self,
        query: &StatisticsQuery,
    ) -> Result<Vec<StatsRecord>, QueryError> {
        Database::query_statistics(self, query).map_err(into_query_error)
    }
}
