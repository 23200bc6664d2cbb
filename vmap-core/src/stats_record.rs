//! Single-row result of an aggregate statistics query.

use serde::Serialize;
use std::collections::BTreeMap;

/// Output-field name to value. `None` means the aggregate came back NULL
/// (for instance an average over rows whose field is empty).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatsRecord(BTreeMap<String, Option<f64>>);

impl StatsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: Option<f64>) {
        self.0.insert(name.to_string(), value);
    }

    /// Value of `name`, `None` if missing or NULL.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied().flatten()
    }

    /// True when no field carries a value.
    pub fn has_no_values(&self) -> bool {
        self.0.values().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for StatsRecord {
    fn from_iter<T: IntoIterator<Item = (S, Option<f64>)>>(iter: T) -> Self {
        StatsRecord(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
