use crate::data_models::{CounterValue, SeriesPoint, UnifiedDataset, COL_CELL, COL_GRAN_END_TIME_FMT_STR};
use crate::errors::PipelineError;
use chrono::{Local, NaiveDateTime};
use csv::Writer;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXPORT_PREFIX: &str = "metrics_extracted_";

/// `metrics_extracted_YYYYMMDD_HHMMSS.csv` for the given moment.
pub fn timestamped_filename(at: NaiveDateTime) -> String {
    format!("{}{}.csv", EXPORT_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// Writes the wide table into `dir` under a local-time stamped name.
pub fn export_to_dir(dataset: &UnifiedDataset, dir: &Path) -> Result<PathBuf, PipelineError> {
    let path = dir.join(timestamped_filename(Local::now().naive_local()));
    write_csv_to_path(dataset, &path)?;
    Ok(path)
}

pub fn write_csv_to_path(dataset: &UnifiedDataset, path: &Path) -> Result<(), PipelineError> {
    let to_export_err = |source: csv::Error| PipelineError::Export {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_csv(dataset, file).map_err(to_export_err)?;
    info!("Exported {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Wide table: metadata, counters, then KPIs. Nulls are empty cells.
pub fn write_csv<W: Write>(dataset: &UnifiedDataset, sink: W) -> Result<(), csv::Error> {
    let columns = dataset.columns();
    let mut writer = Writer::from_writer(sink);
    writer.write_record(&columns)?;
    for record in &dataset.records {
        writer.write_record(
            columns
                .iter()
                .map(|column| record.render(column).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Long table for charting: one row per time, cell and series.
pub fn write_long_csv<W: Write>(points: &[SeriesPoint], sink: W) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(sink);
    writer.write_record([COL_GRAN_END_TIME_FMT_STR, COL_CELL, "KPI", "Value"])?;
    for point in points {
        writer.write_record([
            point.end_time.as_str(),
            point.cell_id.as_str(),
            point.kpi.as_str(),
            CounterValue::Float(point.value).to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_long_csv_to_path(points: &[SeriesPoint], path: &Path) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_long_csv(points, file).map_err(|source| PipelineError::Export {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Exported {} series points to {}", points.len(), path.display());
    Ok(())
}
