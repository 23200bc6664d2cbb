//! Formatting of statistics results for the panel.

use crate::fetcher::StatsOutcome;
use crate::fields::{DisplayField, NumericFormat};
use vmap_core::display::{FormattedStat, StatsDisplay};
use vmap_core::stats_record::StatsRecord;

/// Shown when the current week and viewport have nothing to report.
pub const NO_DATA_MESSAGE: &str = "No vaccination data for the selected week in this area.";

pub fn format_value(value: f64, format: NumericFormat) -> String {
    match format {
        NumericFormat::Integer => to_fixed(value, 0),
        NumericFormat::Percentage => format!("{}%", to_fixed(value, 2)),
    }
}

/// Number of digits after the decimal point in the exact decimal expansion
/// of a finite `value`.
fn exact_fraction_digits(value: f64) -> usize {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    if mantissa == 0 {
        return 0;
    }
    let exponent = exponent + i64::from(mantissa.trailing_zeros());
    usize::try_from(-exponent).unwrap_or(0)
}

/// `value` with `decimals` fraction digits, ties rounded away from zero.
///
/// Rounds the exact binary value, so `1.005` (stored just below) gives
/// `1.00` while `0.125` gives `0.13`.
fn to_fixed(value: f64, decimals: usize) -> String {
    let digits = if value.is_finite() {
        exact_fraction_digits(value)
    } else {
        0
    };
    if digits <= decimals {
        return format!("{:.*}", decimals, value);
    }
    // `{:.N}` prints the exact expansion when N covers every fraction digit
    let exact = format!("{:.*}", digits, value);
    let (kept, dropped) = exact.split_at(exact.len() - (digits - decimals));
    let mut out: Vec<u8> = kept.trim_end_matches('.').as_bytes().to_vec();
    if dropped.as_bytes()[0] >= b'5' {
        let mut carry = true;
        for byte in out.iter_mut().rev() {
            match *byte {
                b'9' => *byte = b'0',
                b'0'..=b'8' => {
                    *byte += 1;
                    carry = false;
                    break;
                }
                _ => {}
            }
        }
        if carry {
            let first_digit = usize::from(out.first() == Some(&b'-'));
            out.insert(first_digit, b'1');
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Project `record` through `fields` in their declared order, skipping
/// absent values. Falls back to [`NO_DATA_MESSAGE`] when nothing is left.
pub fn format_record(record: &StatsRecord, fields: &[DisplayField]) -> StatsDisplay {
    let lines: Vec<FormattedStat> = fields
        .iter()
        .filter_map(|field| {
            record.get(field.output_name).map(|value| FormattedStat {
                label: field.label.to_string(),
                value: format_value(value, field.format),
            })
        })
        .collect();
    if lines.is_empty() {
        StatsDisplay::Fallback(NO_DATA_MESSAGE.to_string())
    } else {
        StatsDisplay::Lines(lines)
    }
}

/// Display content for a fetch outcome. `None` for failures: the panel keeps
/// whatever it showed before.
pub fn format_outcome(outcome: &StatsOutcome, fields: &[DisplayField]) -> Option<StatsDisplay> {
    match outcome {
        StatsOutcome::Record(record) => Some(format_record(record, fields)),
        StatsOutcome::NoMatch => Some(StatsDisplay::Fallback(NO_DATA_MESSAGE.to_string())),
        StatsOutcome::Failed(_) => None,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Panel markup: one `<br/>label: <b><span> value</span></b>` per line.
pub fn render_html(display: &StatsDisplay) -> String {
    match display {
        StatsDisplay::Lines(stats) => stats
            .iter()
            .map(|stat| {
                format!(
                    "<br/>{}: <b><span> {}</span></b>",
                    escape_html(&stat.label),
                    escape_html(&stat.value)
                )
            })
            .collect(),
        StatsDisplay::Fallback(message) => format!("<br/>{}", escape_html(message)),
    }
}
