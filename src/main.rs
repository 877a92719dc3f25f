use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use pm_kpi_pipeline::config::{load_config, PipelineConfig};
use pm_kpi_pipeline::export;
use pm_kpi_pipeline::metrics::METRICS;
use pm_kpi_pipeline::parallel::{expand_inputs, ParallelProcessor};
use pm_kpi_pipeline::pipeline;

#[derive(Parser, Debug)]
#[command(name = "pm_kpi_pipeline")]
#[command(about = "Extract DU performance counters from PM XML files and derive network KPIs", long_about = None)]
struct Args {
    /// PM XML files, directories (searched recursively for *.xml) or glob patterns
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long, env = "PM_PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the timestamped metrics CSV
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Explicit path for the metrics CSV (overrides --output-dir)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write a long-format series CSV for charting
    #[arg(long)]
    long_output: Option<PathBuf>,

    /// Column to include in the long-format output (repeatable, default: all KPIs)
    #[arg(long = "kpi")]
    kpis: Vec<String>,

    /// Exact measObjLdn to keep (repeatable)
    #[arg(long = "allow-dn")]
    allow_dns: Vec<String>,

    /// Keep only cells whose id contains this text, ignoring case (repeatable)
    #[arg(long = "cell")]
    cells: Vec<String>,

    /// Pattern a resolved cell id must match
    #[arg(long)]
    cell_pattern: Option<String>,

    /// Prefix of diagnostic counters to drop before KPI derivation
    #[arg(long)]
    trace_prefix: Option<String>,

    /// Number of files parsed in parallel (0 uses every CPU core)
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    /// Verbose logging and column listing
    #[arg(long)]
    debug: bool,
}

/// File configuration first, then command line flags on top.
fn resolve_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(&path.to_string_lossy())
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    config.allowed_object_dns.extend(args.allow_dns.iter().cloned());
    config.cell_selectors.extend(args.cells.iter().cloned());
    if let Some(pattern) = &args.cell_pattern {
        config.cell_pattern = pattern.clone();
    }
    if let Some(prefix) = &args.trace_prefix {
        config.trace_prefix = prefix.clone();
    }
    config.debug |= args.debug;
    config.cell_regex().context("Invalid --cell-pattern")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: its debug flag sets the default log filter
    let config = resolve_config(&args)?;
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level())).init();
    let start = Instant::now();

    let paths = expand_inputs(&args.inputs);
    if paths.is_empty() {
        bail!("No input files found");
    }
    info!("Processing {} files", paths.len());

    let processor = ParallelProcessor::for_jobs(args.jobs).with_progress(paths.len() > 1);

    let report = pipeline::run(&paths, &config, &processor).context("Pipeline run failed")?;

    for failure in &report.failures {
        error!("{}: {}", failure.file_path.display(), failure.message);
    }
    if report.all_failed() {
        METRICS.lock().log_summary();
        bail!("None of the {} input files could be processed", paths.len());
    }

    if config.debug {
        info!("Available columns:");
        for column in report.dataset.columns() {
            info!("  {}", column);
        }
    }
    if !report.dropped_columns.is_empty() {
        info!("Dropped {} trace columns", report.dropped_columns.len());
    }
    if report.derived_kpis.is_empty() {
        warn!("No KPI could be derived: required counters are missing");
    }

    let summary = &report.summary;
    info!(
        "Files processed: {}, failed: {}, cells: {}, rows: {}",
        summary.files_processed, summary.files_failed, summary.distinct_cells, summary.rows
    );

    let csv_path = match &args.output {
        Some(path) => {
            export::write_csv_to_path(&report.dataset, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path.clone()
        }
        None => export::export_to_dir(&report.dataset, &args.output_dir)
            .with_context(|| format!("Failed to export into {}", args.output_dir.display()))?,
    };
    info!("Metrics written to {}", csv_path.display());

    if let Some(long_path) = &args.long_output {
        let selected: Vec<&str> = if args.kpis.is_empty() {
            report.derived_kpis.iter().map(String::as_str).collect()
        } else {
            let chartable = report.dataset.chartable_columns();
            args.kpis
                .iter()
                .map(String::as_str)
                .filter(|name| {
                    let known = chartable.contains(name);
                    if !known {
                        warn!("Column '{}' is not a counter or KPI column, skipping", name);
                    }
                    known
                })
                .collect()
        };
        let points = report.dataset.long_format(&selected);
        export::write_long_csv_to_path(&points, long_path)
            .with_context(|| format!("Failed to write {}", long_path.display()))?;
    }

    info!("Pipeline completed in {:.2?}", start.elapsed());
    METRICS.lock().log_summary();
    Ok(())
}
