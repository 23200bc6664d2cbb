//! Row model for the `features` table.

use chrono::NaiveDate;
use serde::Serialize;
use vmap_core::geometry::Geometry;

/// One country's vaccination figure for one week.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureRow {
    /// Country display name.
    pub country: String,
    /// ISO 3166-1 alpha-3 code.
    pub iso3: String,
    /// Week number within `year`.
    pub week: i64,
    pub year: i64,
    /// Last day of the reporting week.
    pub week_end_date: NaiveDate,
    /// Share of the population vaccinated, 0-100. `None` when not reported.
    pub percentage: Option<f64>,
    /// Bounding envelope of the country.
    pub envelope: Geometry,
}
