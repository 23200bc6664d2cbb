//! Static statistics definitions for the vaccination layer.

use vmap_core::query::{AggregateSpec, StatisticDefinition, StatisticType};

/// How a value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFormat {
    /// Zero decimal places.
    Integer,
    /// Two decimal places followed by `%`.
    Percentage,
}

/// Projection of one statistics output field onto the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayField {
    pub output_name: &'static str,
    pub label: &'static str,
    pub format: NumericFormat,
}

/// Panel rows, in display order.
pub const VACCINATION_FIELDS: [DisplayField; 5] = [
    DisplayField {
        output_name: "Week",
        label: "Week",
        format: NumericFormat::Integer,
    },
    DisplayField {
        output_name: "Year",
        label: "Year",
        format: NumericFormat::Integer,
    },
    DisplayField {
        output_name: "MaxPercentage",
        label: "Max percentage",
        format: NumericFormat::Percentage,
    },
    DisplayField {
        output_name: "AveragePercentage",
        label: "Average percentage",
        format: NumericFormat::Percentage,
    },
    DisplayField {
        output_name: "MinPercentage",
        label: "Min percentage",
        format: NumericFormat::Percentage,
    },
];

/// Statistics computed on every refresh. Week and year are averaged so the
/// (single) reporting week survives the aggregation.
pub fn vaccination_spec() -> AggregateSpec {
    AggregateSpec(vec![
        StatisticDefinition::new("Week", "Week", StatisticType::Avg),
        StatisticDefinition::new("Year", "Year", StatisticType::Avg),
        StatisticDefinition::new("Percentage", "AveragePercentage", StatisticType::Avg),
        StatisticDefinition::new("Percentage", "MaxPercentage", StatisticType::Max),
        StatisticDefinition::new("Percentage", "MinPercentage", StatisticType::Min),
    ])
}
