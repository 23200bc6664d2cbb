//! CSV loading for the feature table.
//!
//! # CSV Format
//!
//! With headers: `Country,ISO3,Week,Year,WeekEndDate,Percentage,XMin,YMin,XMax,YMax`
//!
//! ```text
//! Country,ISO3,Week,Year,WeekEndDate,Percentage,XMin,YMin,XMax,YMax
//! Portugal,PRT,10,2021,2021-03-14,4.21,-9.5,36.9,-6.2,42.2
//! ```

use crate::models::FeatureRow;
use crate::Database;
use csv::StringRecord;
use rusqlite::params;
use vmap_core::geometry::Geometry;
use vmap_utils::dates::{format_date, parse_date};

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

/// Parse one CSV record; `None` for rows that cannot be placed in time or space.
fn parse_feature_row(record: &StringRecord) -> Option<FeatureRow> {
    let country = field(record, 0);
    let iso3 = field(record, 1);
    if country.is_empty() || iso3.is_empty() {
        return None;
    }
    let week: i64 = field(record, 2).parse().ok()?;
    let year: i64 = field(record, 3).parse().ok()?;
    let week_end_date = parse_date(field(record, 4)).ok()?;
    // Unreported weeks ("", "n/a", ...) are kept with a NULL percentage
    let percentage: Option<f64> = field(record, 5).parse().ok();
    let coords = (6..10)
        .map(|idx| field(record, idx).parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .ok()?;
    let envelope = Geometry::envelope(coords[0], coords[1], coords[2], coords[3]).ok()?;
    Some(FeatureRow {
        country: country.to_string(),
        iso3: iso3.to_string(),
        week,
        year,
        week_end_date,
        percentage,
        envelope,
    })
}

impl Database {
    /// Load weekly feature rows from a CSV string. Returns the number of rows stored.
    ///
    /// Rows without a parsable date, week, year or envelope are skipped and
    /// counted in the log; a repeated (ISO3, date) pair replaces the earlier row.
    pub fn load_features(&self, csv_data: &str) -> anyhow::Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut rows = Vec::new();
        let mut skipped = 0u32;
        for result in rdr.records() {
            let record = result?;
            match parse_feature_row(&record) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }
        self.insert_features(&rows)?;
        log::info!(
            "[VMAP] loader: Loaded {} features, skipped {} unparsable rows",
            rows.len(),
            skipped
        );
        Ok(rows.len())
    }

    /// Insert already-parsed rows in a single transaction.
    pub fn insert_features(&self, rows: &[FeatureRow]) -> anyhow::Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO features
                 (country, iso3, week, year, week_end_date, percentage, xmin, ymin, xmax, ymax)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.country,
                    row.iso3,
                    row.week,
                    row.year,
                    format_date(&row.week_end_date),
                    row.percentage,
                    row.envelope.xmin,
                    row.envelope.ymin,
                    row.envelope.xmax,
                    row.envelope.ymax,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
