//! Raw structures read out of one PM measurement file, before any alignment.

/// Default collection window, in seconds, when a block carries no `granPeriod` duration.
pub const DEFAULT_GRANULARITY_DURATION: &str = "900";

/// One parsed input file.
#[derive(Debug, Clone, Default)]
pub struct MeasurementDocument {
    pub filename: String,
    /// Sender identity from the file header; empty when the header has none.
    pub source_name: String,
    pub blocks: Vec<MeasurementBlock>,
}

/// One `measInfo` section.
#[derive(Debug, Clone)]
pub struct MeasurementBlock {
    /// Counter names in document order. Order is the alignment key for
    /// positional results.
    pub counter_names: Vec<String>,
    /// `p` ids of the counter names when the block uses `measType p="…"`
    /// children. Empty for the `measTypes` text layout.
    pub counter_positions: Vec<String>,
    pub granularity_duration: String,
    pub granularity_end_time: String,
    pub value_entries: Vec<ValueEntry>,
}

impl Default for MeasurementBlock {
    fn default() -> Self {
        Self {
            counter_names: Vec::new(),
            counter_positions: Vec::new(),
            granularity_duration: DEFAULT_GRANULARITY_DURATION.to_string(),
            granularity_end_time: String::new(),
            value_entries: Vec::new(),
        }
    }
}

impl MeasurementBlock {
    /// Looks up the counter name declared with the given `p` id.
    pub fn counter_name_for_position(&self, position: &str) -> Option<&str> {
        self.counter_positions
            .iter()
            .position(|p| p == position)
            .and_then(|index| self.counter_names.get(index))
            .map(String::as_str)
    }
}

/// One `measValue`: the counters reported for a single managed object.
#[derive(Debug, Clone)]
pub struct ValueEntry {
    pub object_dn: String,
    pub results: MeasResults,
}

/// The two encodings of a value entry's results.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasResults {
    /// Whitespace-separated `measResults` text, matched to counter names by position.
    Positional(Vec<String>),
    /// `r p="…"` children, matched to counter names by `p` id.
    Keyed(Vec<(String, String)>),
}

impl MeasResults {
    pub fn len(&self) -> usize {
        match self {
            MeasResults::Positional(values) => values.len(),
            MeasResults::Keyed(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
