//! Declarative descriptions of the two query shapes the pipeline issues.
//!
//! Backends translate these into SQL or feature-service requests; field names
//! here are the dataset's public field names (`WeekEndDate`, `Percentage`, ...).

use crate::geometry::Geometry;
use crate::time_extent::TimeWindow;
use serde::Serialize;
use std::fmt;

/// Aggregate function applied to a source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticType {
    Avg,
    Min,
    Max,
    Sum,
    Count,
}

impl StatisticType {
    /// SQL aggregate function name.
    pub fn sql_function(&self) -> &'static str {
        match self {
            StatisticType::Avg => "AVG",
            StatisticType::Min => "MIN",
            StatisticType::Max => "MAX",
            StatisticType::Sum => "SUM",
            StatisticType::Count => "COUNT",
        }
    }
}

/// One entry of an [`AggregateSpec`]. Serializes to the feature-service
/// `outStatistics` element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticDefinition {
    pub on_statistic_field: String,
    pub out_statistic_field_name: String,
    pub statistic_type: StatisticType,
}

impl StatisticDefinition {
    pub fn new(source_field: &str, output_name: &str, statistic_type: StatisticType) -> Self {
        Self {
            on_statistic_field: source_field.to_string(),
            out_statistic_field_name: output_name.to_string(),
            statistic_type,
        }
    }
}

/// Ordered list of statistics to compute over the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct AggregateSpec(pub Vec<StatisticDefinition>);

impl AggregateSpec {
    pub fn iter(&self) -> impl Iterator<Item = &StatisticDefinition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<StatisticDefinition> for AggregateSpec {
    fn from_iter<T: IntoIterator<Item = StatisticDefinition>>(iter: T) -> Self {
        AggregateSpec(iter.into_iter().collect())
    }
}

/// Time window plus viewport geometry. Rebuilt on every change, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryFilter {
    pub time_window: TimeWindow,
    pub geometry: Geometry,
}

impl QueryFilter {
    pub fn new(time_window: TimeWindow, geometry: Geometry) -> Self {
        Self {
            time_window,
            geometry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Grouped top-N query over the distinct values of a date field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopFeaturesQuery {
    pub date_field: String,
    pub top_count: u32,
    pub order: SortOrder,
}

impl TopFeaturesQuery {
    /// The single earliest distinct value of `date_field`.
    pub fn earliest(date_field: &str) -> Self {
        Self {
            date_field: date_field.to_string(),
            top_count: 1,
            order: SortOrder::Ascending,
        }
    }

    /// The single latest distinct value of `date_field`.
    pub fn latest(date_field: &str) -> Self {
        Self {
            date_field: date_field.to_string(),
            top_count: 1,
            order: SortOrder::Descending,
        }
    }

    /// `orderByFields` clause in feature-service syntax, e.g. `WeekEndDate DESC`.
    pub fn order_by_clause(&self) -> String {
        match self.order {
            SortOrder::Ascending => self.date_field.clone(),
            SortOrder::Descending => format!("{} DESC", self.date_field),
        }
    }
}

/// Aggregate query scoped by a [`QueryFilter`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsQuery {
    pub filter: QueryFilter,
    /// Field the time window applies to.
    pub date_field: String,
    pub statistics: AggregateSpec,
}

impl fmt::Display for StatisticsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} statistics on {} within {} and {}",
            self.statistics.len(),
            self.date_field,
            self.filter.time_window,
            self.filter.geometry
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistic_definition_serializes_to_out_statistics() {
        let spec: AggregateSpec = vec![StatisticDefinition::new(
            "Percentage",
            "AveragePercentage",
            StatisticType::Avg,
        )]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(
            json,
            r#"[{"onStatisticField":"Percentage","outStatisticFieldName":"AveragePercentage","statisticType":"avg"}]"#
        );
    }

    #[test]
    fn order_by_clause() {
        assert_eq!(
            TopFeaturesQuery::earliest("WeekEndDate").order_by_clause(),
            "WeekEndDate"
        );
        assert_eq!(
            TopFeaturesQuery::latest("WeekEndDate").order_by_clause(),
            "WeekEndDate DESC"
        );
    }

    #[test]
    fn sql_keywords() {
        assert_eq!(StatisticType::Max.sql_function(), "MAX");
        assert_eq!(SortOrder::Descending.sql_keyword(), "DESC");
    }
}
