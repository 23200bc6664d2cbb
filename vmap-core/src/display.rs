//! What the statistics panel is asked to show.

use serde::Serialize;

/// One formatted label/value pair, e.g. `Average percentage` / `50.00%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedStat {
    pub label: String,
    pub value: String,
}

/// Content handed to a [`DisplaySurface`](crate::traits::DisplaySurface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum StatsDisplay {
    /// Formatted statistics, in display order. Never empty.
    Lines(Vec<FormattedStat>),
    /// Message shown when there is nothing to display.
    Fallback(String),
}

impl StatsDisplay {
    /// `label: value` lines, or the fallback message alone.
    pub fn to_text_lines(&self) -> Vec<String> {
        match self {
            StatsDisplay::Lines(stats) => stats
                .iter()
                .map(|stat| format!("{}: {}", stat.label, stat.value))
                .collect(),
            StatsDisplay::Fallback(message) => vec![message.clone()],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StatsDisplay::Fallback(_))
    }
}
