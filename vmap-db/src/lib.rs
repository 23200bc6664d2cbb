//! In-memory SQLite feature table for weekly per-country vaccination data.
//!
//! This crate is the offline implementation of the
//! [`FeatureSource`](vmap_core::traits::FeatureSource) collaborator: CSV data is
//! loaded into an in-memory SQLite database and the pipeline's top-feature
//! and statistics queries are answered with SQL.
//!
//! # Architecture
//!
//! - `Arc<Mutex<Connection>>` wrapper so the database can be shared with the
//!   tokio tasks of the statistics pipeline
//! - In-memory SQLite via `rusqlite`
//! - Public field names (`WeekEndDate`, `Percentage`, ...) are mapped to
//!   columns through a fixed whitelist; nothing user-supplied is spliced into SQL
//!
//! # Usage
//!
//! ```rust
//! use vmap_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_features("Country,ISO3,Week,Year,WeekEndDate,Percentage,XMin,YMin,XMax,YMax\nCountry A,AAA,1,2021,2021-01-03,1.0,0,0,10,10\n").unwrap();
//! let (first, last) = db.query_date_range().unwrap().unwrap();
//! assert_eq!(first, last);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
mod queries;
mod source;
pub mod models;

use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory SQLite database holding the vaccination feature table.
///
/// Cheaply cloneable; clones share the same connection.
///
/// # Example
///
/// ```rust
/// use vmap_db::Database;
///
/// let db = Database::new().unwrap();
/// db.load_features("Country,ISO3,Week,Year,WeekEndDate,Percentage,XMin,YMin,XMax,YMax\nCountry A,AAA,1,2021,2021-01-03,1.0,0,0,10,10\n").unwrap();
/// assert_eq!(db.query_feature_count().unwrap(), 1);
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use [`load_features`](Self::load_features)
    /// to populate it.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }
}
