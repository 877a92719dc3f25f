//! Module for data-quality checks on measurement blocks.

use crate::models::{MeasResults, MeasurementBlock, ValueEntry};

/// How a value entry lines up with its block's counter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    Exact,
    /// More names than values; trailing names get no value.
    MissingValues { names: usize, values: usize },
    /// More values than names; trailing values are dropped.
    ExtraValues { names: usize, values: usize },
    /// Keyed results whose `p` ids are not declared by the block.
    UnknownPositions(Vec<String>),
}

impl Alignment {
    pub fn is_exact(&self) -> bool {
        matches!(self, Alignment::Exact)
    }
}

/// Checks an entry against its block.
///
/// This only reports; the row builder truncates regardless of the outcome.
pub fn check_alignment(block: &MeasurementBlock, entry: &ValueEntry) -> Alignment {
    match &entry.results {
        MeasResults::Positional(values) => {
            let names = block.counter_names.len();
            let values = values.len();
            if names > values {
                Alignment::MissingValues { names, values }
            } else if values > names {
                Alignment::ExtraValues { names, values }
            } else {
                Alignment::Exact
            }
        }
        MeasResults::Keyed(pairs) => {
            let unknown: Vec<String> = pairs
                .iter()
                .filter(|(p, _)| block.counter_name_for_position(p).is_none())
                .map(|(p, _)| p.clone())
                .collect();
            if unknown.is_empty() {
                Alignment::Exact
            } else {
                Alignment::UnknownPositions(unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(names: &[&str]) -> MeasurementBlock {
        MeasurementBlock {
            counter_names: names.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn positional(values: &[&str]) -> ValueEntry {
        ValueEntry {
            object_dn: "Cell=1".into(),
            results: MeasResults::Positional(values.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_positional_alignment() {
        let b = block(&["A", "B", "C"]);
        assert!(check_alignment(&b, &positional(&["1", "2", "3"])).is_exact());
        assert_eq!(
            check_alignment(&b, &positional(&["1", "2"])),
            Alignment::MissingValues { names: 3, values: 2 }
        );
        assert_eq!(
            check_alignment(&b, &positional(&["1", "2", "3", "4"])),
            Alignment::ExtraValues { names: 3, values: 4 }
        );
    }

    #[test]
    fn test_keyed_alignment() {
        let mut b = block(&["A", "B"]);
        b.counter_positions = vec!["1".into(), "2".into()];
        let entry = ValueEntry {
            object_dn: "Cell=1".into(),
            results: MeasResults::Keyed(vec![("1".into(), "5".into()), ("9".into(), "6".into())]),
        };
        assert_eq!(
            check_alignment(&b, &entry),
            Alignment::UnknownPositions(vec!["9".into()])
        );
    }
}
