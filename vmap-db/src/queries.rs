//! Typed query methods backing the pipeline's dataset queries.
//!
//! Every window filter is inclusive on both ends and compares
//! `week_end_date` as `YYYY-MM-DD` text. Spatial filters test envelope
//! intersection between the query geometry and each country's envelope.

use crate::schema::{column_for_field, is_valid_alias};
use crate::Database;
use chrono::NaiveDate;
use rusqlite::params;
use vmap_core::error::QueryError;
use vmap_core::geometry::Geometry;
use vmap_core::query::{QueryFilter, StatisticsQuery, TopFeaturesQuery};
use vmap_core::stats_record::StatsRecord;
use vmap_utils::dates::{format_date, parse_date};

/// Name of the row-count column appended to every statistics query.
const MATCHED_ROWS: &str = "__matched_rows";

/// WHERE clause shared by the filtered queries; parameters ?1..?6 are
/// window start/end and the geometry's xmin, xmax, ymin, ymax.
const FILTER_CLAUSE: &str = "week_end_date >= ?1 AND week_end_date <= ?2
       AND xmax >= ?3 AND xmin <= ?4
       AND ymax >= ?5 AND ymin <= ?6";

fn column(field: &str) -> anyhow::Result<&'static str> {
    column_for_field(field).ok_or_else(|| QueryError::UnknownField(field.to_string()).into())
}

fn filter_params(filter: &QueryFilter) -> (String, String, f64, f64, f64, f64) {
    let g: &Geometry = &filter.geometry;
    (
        format_date(&filter.time_window.start()),
        format_date(&filter.time_window.end()),
        g.xmin,
        g.xmax,
        g.ymin,
        g.ymax,
    )
}

impl Database {
    /// Total number of feature rows.
    pub fn query_feature_count(&self) -> anyhow::Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Earliest and latest week-ending dates, `None` when the table is empty.
    pub fn query_date_range(&self) -> anyhow::Result<Option<(NaiveDate, NaiveDate)>> {
        let conn = self.conn()?;
        let (min_date, max_date) = conn.query_row(
            "SELECT MIN(week_end_date), MAX(week_end_date) FROM features",
            [],
            |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
        )?;
        log::info!(
            "[VMAP] query: query_date_range returned ({:?}, {:?})",
            min_date,
            max_date
        );
        match (min_date, max_date) {
            (Some(min), Some(max)) => Ok(Some((parse_date(&min)?, parse_date(&max)?))),
            _ => Ok(None),
        }
    }

    /// Distinct values of the query's date field, grouped, ordered and limited
    /// to the top `top_count` groups.
    pub fn query_top_dates(&self, query: &TopFeaturesQuery) -> anyhow::Result<Vec<NaiveDate>> {
        let col = column(&query.date_field)?;
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {col} FROM features GROUP BY {col} ORDER BY {col} {} LIMIT ?1",
            query.order.sql_keyword()
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw: Vec<String> = stmt
            .query_map(params![query.top_count], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let dates = raw
            .iter()
            .map(|s| {
                parse_date(s).map_err(|e| {
                    anyhow::Error::from(QueryError::Decode(format!(
                        "{} value `{}` is not a date: {}",
                        query.date_field, s, e
                    )))
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!(
            "[VMAP] query: query_top_dates ({}) returned {} records",
            query.order_by_clause(),
            dates.len()
        );
        Ok(dates)
    }

    /// Aggregate the rows matching the query's filter.
    ///
    /// Returns a single record, or no record at all when the filter matches
    /// zero rows (SQLite would otherwise report one all-NULL row).
    pub fn query_statistics(&self, query: &StatisticsQuery) -> anyhow::Result<Vec<StatsRecord>> {
        let date_col = column(&query.date_field)?;
        if date_col != "week_end_date" {
            return Err(QueryError::UnknownField(query.date_field.clone()).into());
        }

        let mut select = Vec::with_capacity(query.statistics.len() + 1);
        for stat in query.statistics.iter() {
            let source = column(&stat.on_statistic_field)?;
            if !is_valid_alias(&stat.out_statistic_field_name) {
                return Err(QueryError::UnknownField(stat.out_statistic_field_name.clone()).into());
            }
            select.push(format!(
                "{}({}) AS \"{}\"",
                stat.statistic_type.sql_function(),
                source,
                stat.out_statistic_field_name
            ));
        }
        select.push(format!("COUNT(*) AS {}", MATCHED_ROWS));

        let sql = format!(
            "SELECT {} FROM features WHERE {}",
            select.join(", "),
            FILTER_CLAUSE
        );
        let (start, end, xmin, xmax, ymin, ymax) = filter_params(&query.filter);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<&str> = query
            .statistics
            .iter()
            .map(|stat| stat.out_statistic_field_name.as_str())
            .collect();
        let (record, matched) = stmt.query_row(
            params![start, end, xmin, xmax, ymin, ymax],
            |row| {
                let mut record = StatsRecord::new();
                for (idx, name) in names.iter().enumerate() {
                    record.insert(name, row.get::<_, Option<f64>>(idx)?);
                }
                let matched: i64 = row.get(names.len())?;
                Ok((record, matched))
            },
        )?;
        log::info!(
            "[VMAP] query: query_statistics ({}) matched {} rows",
            query,
            matched
        );
        if matched == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![record])
    }
}
