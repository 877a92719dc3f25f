use std::collections::HashSet;
use std::fmt;

// Output column names for the per-record metadata, in table order.
pub const COL_FILENAME: &str = "xml_filename";
pub const COL_SERIAL: &str = "serial";
pub const COL_SOURCE_NAME: &str = "SourceName";
pub const COL_GRAN_DURATION: &str = "granPeriodDuration";
pub const COL_GRAN_END_TIME: &str = "granPeriodEndTime";
pub const COL_GRAN_END_TIME_FMT: &str = "granPeriodEndTime_fmt";
pub const COL_GRAN_END_TIME_FMT_STR: &str = "granPeriodEndTime_fmt_str";
pub const COL_CELL: &str = "Cell";

pub const METADATA_COLUMNS: [&str; 8] = [
    COL_FILENAME,
    COL_SERIAL,
    COL_SOURCE_NAME,
    COL_GRAN_DURATION,
    COL_GRAN_END_TIME,
    COL_GRAN_END_TIME_FMT,
    COL_GRAN_END_TIME_FMT_STR,
    COL_CELL,
];

/// A counter or KPI value after numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CounterValue {
    /// Numeric view used by KPI arithmetic. Text never converts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CounterValue::Integer(v) => Some(*v as f64),
            CounterValue::Float(v) => Some(*v),
            CounterValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Integer(v) => write!(f, "{}", v),
            // Whole floats keep one decimal so KPI columns read as floats (50.0, not 50)
            CounterValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            CounterValue::Float(v) => write!(f, "{}", v),
            CounterValue::Text(s) => f.write_str(s),
        }
    }
}

/// One output row: the counters of a single managed object in a single
/// measurement block, plus the metadata of the block and file it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellRecord {
    pub cell_id: String,
    pub serial: Option<String>,
    pub source_filename: String,
    pub source_name: String,
    pub granularity_duration: String,
    pub granularity_end_time: String,
    pub granularity_end_time_fmt: String,
    pub granularity_end_time_display: String,
    /// Base counters in block order, then derived KPI values. Absent means null.
    pub values: Vec<(String, CounterValue)>,
}

impl CellRecord {
    pub fn get(&self, column: &str) -> Option<&CounterValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Sets a value, replacing an earlier one with the same name in place.
    pub fn set(&mut self, column: &str, value: CounterValue) {
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    pub fn value_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Renders a metadata column. Returns `None` for anything else.
    pub fn metadata(&self, column: &str) -> Option<&str> {
        match column {
            COL_FILENAME => Some(&self.source_filename),
            COL_SERIAL => Some(self.serial.as_deref().unwrap_or("")),
            COL_SOURCE_NAME => Some(&self.source_name),
            COL_GRAN_DURATION => Some(&self.granularity_duration),
            COL_GRAN_END_TIME => Some(&self.granularity_end_time),
            COL_GRAN_END_TIME_FMT => Some(&self.granularity_end_time_fmt),
            COL_GRAN_END_TIME_FMT_STR => Some(&self.granularity_end_time_display),
            COL_CELL => Some(&self.cell_id),
            _ => None,
        }
    }

    /// Cell text for any column; null renders as `None`.
    pub fn render(&self, column: &str) -> Option<String> {
        match self.metadata(column) {
            Some(value) => Some(value.to_string()),
            None => self.get(column).map(|v| v.to_string()),
        }
    }
}

/// All records of a run with an explicit, dataset-wide column set.
#[derive(Debug, Clone, Default)]
pub struct UnifiedDataset {
    pub records: Vec<CellRecord>,
    /// Union of counter names over every record, in first-seen order.
    pub counter_columns: Vec<String>,
    /// Derived KPI columns that were computed, in catalog order.
    pub kpi_columns: Vec<String>,
}

impl UnifiedDataset {
    /// Builds a dataset and its counter column union from records.
    pub fn from_records(records: Vec<CellRecord>) -> Self {
        let mut dataset = Self {
            records,
            ..Default::default()
        };
        dataset.recompute_counter_columns();
        dataset
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rebuilds `counter_columns` from the current records, keeping the
    /// previous order for columns that are still present.
    pub fn recompute_counter_columns(&mut self) {
        let kpis: HashSet<&str> = self.kpi_columns.iter().map(String::as_str).collect();
        let present: HashSet<&str> = self
            .records
            .iter()
            .flat_map(|r| r.value_names())
            .collect();

        let mut columns: Vec<String> = self
            .counter_columns
            .iter()
            .filter(|c| present.contains(c.as_str()) && !kpis.contains(c.as_str()))
            .cloned()
            .collect();
        let mut seen: HashSet<String> = columns.iter().cloned().collect();

        for record in &self.records {
            for name in record.value_names() {
                if !kpis.contains(name) && seen.insert(name.to_string()) {
                    columns.push(name.to_string());
                }
            }
        }
        self.counter_columns = columns;
    }

    /// Every column of the table: metadata, counters, then KPIs.
    pub fn columns(&self) -> Vec<String> {
        METADATA_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.counter_columns.iter().cloned())
            .chain(self.kpi_columns.iter().cloned())
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        METADATA_COLUMNS.contains(&column)
            || self.counter_columns.iter().any(|c| c == column)
            || self.kpi_columns.iter().any(|c| c == column)
    }

    /// Value columns a chart can plot: counters and KPIs, no metadata.
    pub fn chartable_columns(&self) -> Vec<&str> {
        self.counter_columns
            .iter()
            .chain(self.kpi_columns.iter())
            .map(String::as_str)
            .collect()
    }

    /// Melts the selected columns into one point per (time, cell, column).
    /// Non-numeric and null values are left out.
    pub fn long_format(&self, selected: &[&str]) -> Vec<SeriesPoint> {
        let mut points = Vec::new();
        for record in &self.records {
            for column in selected {
                if let Some(value) = record.get(column).and_then(CounterValue::as_f64) {
                    points.push(SeriesPoint {
                        end_time: record.granularity_end_time_display.clone(),
                        cell_id: record.cell_id.clone(),
                        kpi: column.to_string(),
                        value,
                    });
                }
            }
        }
        points
    }
}

/// One point of a long-format KPI series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub end_time: String,
    pub cell_id: String,
    pub kpi: String,
    pub value: f64,
}
