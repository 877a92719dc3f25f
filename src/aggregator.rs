//! Merges per-file records into one dataset and applies row/column filters.

use log::{debug, info};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::data_models::UnifiedDataset;
use crate::parallel::FileProcessResult;

/// A file that contributed no records because it could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub file_path: PathBuf,
    pub message: String,
}

/// Batch statistics shown next to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub distinct_cells: usize,
    pub rows: usize,
}

/// Concatenates every file's records in input order.
///
/// Files with differing counter sets are fine: the column set is the union
/// and a row simply has no value for counters its file did not report.
pub fn aggregate(results: Vec<FileProcessResult>) -> (UnifiedDataset, Vec<FileFailure>) {
    let mut records = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result.error {
            Some(message) => failures.push(FileFailure {
                file_path: result.file_path,
                message,
            }),
            None => records.extend(result.records),
        }
    }

    let dataset = UnifiedDataset::from_records(records);
    info!(
        "Aggregated {} rows with {} counter columns ({} files failed)",
        dataset.len(),
        dataset.counter_columns.len(),
        failures.len()
    );
    (dataset, failures)
}

/// Keeps only rows whose cell id matches the cell naming pattern.
pub fn retain_cells(dataset: &mut UnifiedDataset, pattern: &Regex) {
    let before = dataset.len();
    dataset.records.retain(|r| pattern.is_match(&r.cell_id));
    if dataset.len() != before {
        debug!(
            "Dropped {} rows whose object could not be resolved to a cell",
            before - dataset.len()
        );
        dataset.recompute_counter_columns();
    }
}

/// Keeps rows whose cell id contains any selector, ignoring case. No
/// selectors keeps everything.
pub fn retain_selected(dataset: &mut UnifiedDataset, selectors: &[String]) {
    let selectors: Vec<String> = selectors
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if selectors.is_empty() {
        return;
    }

    let before = dataset.len();
    dataset.records.retain(|r| {
        let cell = r.cell_id.to_lowercase();
        selectors.iter().any(|s| cell.contains(s.as_str()))
    });
    if dataset.len() != before {
        debug!("Cell selection kept {} of {} rows", dataset.len(), before);
        dataset.recompute_counter_columns();
    }
}

/// Removes every counter column whose name starts with `prefix`.
pub fn drop_prefixed_columns(dataset: &mut UnifiedDataset, prefix: &str) -> Vec<String> {
    if prefix.is_empty() {
        return Vec::new();
    }
    let dropped: Vec<String> = dataset
        .counter_columns
        .iter()
        .filter(|c| c.starts_with(prefix))
        .cloned()
        .collect();
    if dropped.is_empty() {
        return dropped;
    }

    for record in &mut dataset.records {
        record.values.retain(|(name, _)| !name.starts_with(prefix));
    }
    dataset.counter_columns.retain(|c| !c.starts_with(prefix));
    debug!("Dropped {} '{}' columns", dropped.len(), prefix);
    dropped
}

pub fn summarize(dataset: &UnifiedDataset, files_processed: usize, files_failed: usize) -> DatasetSummary {
    let distinct_cells: HashSet<&str> = dataset.records.iter().map(|r| r.cell_id.as_str()).collect();
    DatasetSummary {
        files_processed,
        files_failed,
        distinct_cells: distinct_cells.len(),
        rows: dataset.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{CellRecord, CounterValue};

    fn record(cell: &str, file: &str, values: &[(&str, i64)]) -> CellRecord {
        CellRecord {
            cell_id: cell.to_string(),
            source_filename: file.to_string(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), CounterValue::Integer(*v)))
                .collect(),
            ..Default::default()
        }
    }

    fn ok(file: &str, records: Vec<CellRecord>) -> FileProcessResult {
        FileProcessResult {
            file_path: PathBuf::from(file),
            records,
            error: None,
            processing_time_ms: 0,
        }
    }

    #[test]
    fn test_disjoint_counter_sets_union() {
        let (dataset, failures) = aggregate(vec![
            ok("a.xml", vec![record("Cell1", "a.xml", &[("A", 1)])]),
            ok("b.xml", vec![record("Cell1", "b.xml", &[("B", 2)]), record("Cell2", "b.xml", &[("B", 3)])]),
        ]);
        assert!(failures.is_empty());
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.counter_columns, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(dataset.records[0].render("B"), None);
        assert_eq!(dataset.records[1].render("A"), None);
        assert_eq!(dataset.records[2].source_filename, "b.xml");
    }

    #[test]
    fn test_failed_files_are_reported_not_merged() {
        let failed = FileProcessResult {
            file_path: PathBuf::from("bad.xml"),
            records: Vec::new(),
            error: Some("Malformed XML".into()),
            processing_time_ms: 0,
        };
        let (dataset, failures) = aggregate(vec![failed, ok("a.xml", vec![record("Cell1", "a.xml", &[])])]);
        assert_eq!(dataset.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file_path, PathBuf::from("bad.xml"));
    }

    #[test]
    fn test_retain_cells_drops_unresolved_rows() {
        let mut dataset = UnifiedDataset::from_records(vec![
            record("Cell1", "a.xml", &[("A", 1)]),
            record("ME-Id=DU-1,Sector=2", "a.xml", &[("Z", 1)]),
        ]);
        retain_cells(&mut dataset, &Regex::new("Cell").unwrap());
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.counter_columns, vec!["A".to_string()]);
    }

    #[test]
    fn test_retain_selected_is_case_insensitive() {
        let mut dataset = UnifiedDataset::from_records(vec![
            record("Cell1", "a.xml", &[]),
            record("Cell2", "a.xml", &[]),
            record("Cell3", "a.xml", &[]),
        ]);
        retain_selected(&mut dataset, &["CELL1".to_string(), "cell3".to_string()]);
        let cells: Vec<&str> = dataset.records.iter().map(|r| r.cell_id.as_str()).collect();
        assert_eq!(cells, vec!["Cell1", "Cell3"]);

        retain_selected(&mut dataset, &[]);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_drop_trace_columns() {
        let mut dataset = UnifiedDataset::from_records(vec![record(
            "Cell1",
            "a.xml",
            &[("TraceDU.Foo", 1), ("RACH.NumMsg1Rcvd", 2), ("TraceDU.Bar", 3)],
        )]);
        let dropped = drop_prefixed_columns(&mut dataset, "TraceDU.");
        assert_eq!(dropped, vec!["TraceDU.Foo".to_string(), "TraceDU.Bar".to_string()]);
        assert_eq!(dataset.counter_columns, vec!["RACH.NumMsg1Rcvd".to_string()]);
        assert_eq!(dataset.records[0].values.len(), 1);
    }

    #[test]
    fn test_summary() {
        let dataset = UnifiedDataset::from_records(vec![
            record("Cell1", "a.xml", &[]),
            record("Cell1", "b.xml", &[]),
            record("Cell2", "b.xml", &[]),
        ]);
        assert_eq!(
            summarize(&dataset, 2, 1),
            DatasetSummary {
                files_processed: 2,
                files_failed: 1,
                distinct_cells: 2,
                rows: 3
            }
        );
    }
}
