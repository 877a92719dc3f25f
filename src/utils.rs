use chrono::NaiveDateTime;

use crate::data_models::CounterValue;

/// Compact end-time layout written by the DU exporter, e.g. `20240115T103000`.
const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%S";
/// ISO-8601 with (optional) fractional seconds and a `Z` suffix.
const ISO_FRACTIONAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Coerces one raw result token.
///
/// Integral floats become `Integer` (`"2.0"` -> `2`), other floats stay
/// `Float`, and anything that does not parse is kept verbatim as `Text`.
pub fn coerce_counter_value(raw: &str) -> CounterValue {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            CounterValue::Integer(v as i64)
        }
        Ok(v) => CounterValue::Float(v),
        Err(_) => CounterValue::Text(raw.to_string()),
    }
}

/// The forms a granularity end time is reported in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEndTime {
    /// Parsed datetime rendering, or the raw value when it did not parse.
    pub datetime: String,
    /// `YYYY/MM/DD hh:mm:ss`, or the raw value when it did not parse.
    pub display: String,
}

/// Parses an end time in one of the known exporter layouts.
pub fn parse_end_time(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() == 15 {
        NaiveDateTime::parse_from_str(raw, COMPACT_FORMAT).ok()
    } else if raw.contains('T') && raw.contains('-') {
        NaiveDateTime::parse_from_str(raw, ISO_FRACTIONAL_FORMAT).ok()
    } else {
        None
    }
}

/// Unknown layouts pass through unchanged to both forms.
pub fn normalize_end_time(raw: &str) -> NormalizedEndTime {
    match parse_end_time(raw) {
        Some(dt) => NormalizedEndTime {
            datetime: dt.format(DATETIME_FORMAT).to_string(),
            display: dt.format(DISPLAY_FORMAT).to_string(),
        },
        None => NormalizedEndTime {
            datetime: raw.to_string(),
            display: raw.to_string(),
        },
    }
}

/// Splits whitespace-delimited text into owned tokens.
pub fn split_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
