//! End-to-end batch: files in, filtered KPI table out.

use crate::aggregator::{self, DatasetSummary, FileFailure};
use crate::config::PipelineConfig;
use crate::data_models::UnifiedDataset;
use crate::errors::PipelineError;
use crate::kpi;
use crate::parallel::ParallelProcessor;
use crate::time_operation;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Outcome of one batch run.
#[derive(Debug)]
pub struct PipelineReport {
    pub dataset: UnifiedDataset,
    pub failures: Vec<FileFailure>,
    pub summary: DatasetSummary,
    /// Trace columns removed before KPI derivation.
    pub dropped_columns: Vec<String>,
    pub derived_kpis: Vec<String>,
}

impl PipelineReport {
    /// True when at least one input was given and none could be processed.
    pub fn all_failed(&self) -> bool {
        self.summary.files_processed == 0 && self.summary.files_failed > 0
    }
}

/// Raw merged records of a batch, before any filtering.
#[derive(Debug)]
pub struct ExtractedBatch {
    pub dataset: UnifiedDataset,
    pub failures: Vec<FileFailure>,
    pub files_processed: usize,
}

/// Parses every file and merges the results. Per-file failures are
/// collected, never propagated.
pub fn extract_records(paths: &[PathBuf], config: &PipelineConfig, processor: &ParallelProcessor) -> ExtractedBatch {
    let resolver = config.resolver();
    let results = time_operation!("extract", processor.process_files(paths, &resolver));
    let (dataset, failures) = aggregator::aggregate(results);
    for failure in &failures {
        warn!("Skipped {}: {}", failure.file_path.display(), failure.message);
    }
    ExtractedBatch {
        files_processed: paths.len() - failures.len(),
        dataset,
        failures,
    }
}

/// Applies cell filters, drops trace counters and derives KPIs in place.
/// Returns the dropped trace columns and the derived KPI names.
pub fn build_kpi_table(
    dataset: &mut UnifiedDataset,
    config: &PipelineConfig,
) -> Result<(Vec<String>, Vec<String>), PipelineError> {
    let pattern = config.cell_regex()?;
    aggregator::retain_cells(dataset, &pattern);
    aggregator::retain_selected(dataset, &config.cell_selectors);
    let dropped = aggregator::drop_prefixed_columns(dataset, &config.trace_prefix);
    let derived = time_operation!("derive_kpis", kpi::derive_kpis(dataset));
    Ok((dropped, derived))
}

/// Runs extraction and table building for a batch of files.
pub fn run(paths: &[PathBuf], config: &PipelineConfig, processor: &ParallelProcessor) -> Result<PipelineReport, PipelineError> {
    info!("Running pipeline over {} input files", paths.len());
    let ExtractedBatch {
        mut dataset,
        failures,
        files_processed,
    } = extract_records(paths, config, processor);

    let (dropped_columns, derived_kpis) = build_kpi_table(&mut dataset, config)?;
    let summary = aggregator::summarize(&dataset, files_processed, failures.len());
    debug!("Pipeline summary: {:?}", summary);

    Ok(PipelineReport {
        dataset,
        failures,
        summary,
        dropped_columns,
        derived_kpis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch() {
        let report = run(&[], &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        assert!(report.dataset.is_empty());
        assert!(!report.all_failed());
        assert!(report.derived_kpis.is_empty());
        assert_eq!(report.summary.rows, 0);
    }

    #[test]
    fn test_invalid_cell_pattern_is_config_error() {
        let config = PipelineConfig {
            cell_pattern: "Cell(".into(),
            ..Default::default()
        };
        let err = run(&[], &config, &ParallelProcessor::sequential()).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn test_all_failed() {
        let paths = vec![PathBuf::from("/no/such/a.xml"), PathBuf::from("/no/such/b.xml")];
        let report = run(&paths, &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        assert!(report.all_failed());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.summary.files_failed, 2);
    }
}
