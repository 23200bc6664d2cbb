//! SQL schema for the in-memory SQLite database.

/// Returns the full SQL schema as a single batch string.
///
/// `features` holds one row per country and week: the week number and year,
/// the week-ending date (`YYYY-MM-DD`, so text order is date order), the
/// vaccination percentage (nullable) and the country's bounding envelope.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS features (
        country TEXT NOT NULL,
        iso3 TEXT NOT NULL,
        week INTEGER NOT NULL,
        year INTEGER NOT NULL,
        week_end_date TEXT NOT NULL,
        percentage REAL,
        xmin REAL NOT NULL,
        ymin REAL NOT NULL,
        xmax REAL NOT NULL,
        ymax REAL NOT NULL,
        PRIMARY KEY (iso3, week_end_date)
    );
    CREATE INDEX IF NOT EXISTS idx_features_date ON features(week_end_date);
    "#
}

/// Column backing a public dataset field name.
pub fn column_for_field(field: &str) -> Option<&'static str> {
    match field {
        "Country" => Some("country"),
        "ISO3" => Some("iso3"),
        "Week" => Some("week"),
        "Year" => Some("year"),
        "WeekEndDate" => Some("week_end_date"),
        "Percentage" => Some("percentage"),
        _ => None,
    }
}

/// Output aliases are quoted into SQL, so they are limited to identifier characters.
pub fn is_valid_alias(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
