use log::info;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Global metrics instance
pub static METRICS: Lazy<Mutex<Metrics>> = Lazy::new(|| Mutex::new(Metrics::new()));

/// Pipeline metrics tracker
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_files_attempted: u64,
    pub total_files_successful: u64,
    pub total_files_failed: u64,
    pub total_records_built: u64,
    pub total_bytes_processed: u64,
    pub entries_outside_allow_list: u64,
    pub misaligned_entries: u64,
    pub processing_times: BTreeMap<String, Duration>,
    pub start_time: Option<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_file_attempt(&mut self) {
        self.total_files_attempted += 1;
    }

    pub fn record_file_success(&mut self, records: u64) {
        self.total_files_successful += 1;
        self.total_records_built += records;
    }

    pub fn record_file_failure(&mut self) {
        self.total_files_failed += 1;
    }

    pub fn record_bytes_processed(&mut self, bytes: u64) {
        self.total_bytes_processed += bytes;
    }

    pub fn record_outside_allow_list(&mut self) {
        self.entries_outside_allow_list += 1;
    }

    pub fn record_misaligned_entry(&mut self) {
        self.misaligned_entries += 1;
    }

    pub fn record_processing_time(&mut self, operation: String, duration: Duration) {
        self.processing_times.insert(operation, duration);
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn get_throughput(&self) -> f64 {
        let duration_secs = self.get_total_duration().as_secs_f64();
        if duration_secs > 0.0 {
            self.total_records_built as f64 / duration_secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("========== Pipeline Metrics Summary ==========");
        info!("Total Duration: {:.2?}", self.get_total_duration());
        info!("Files Attempted: {}", self.total_files_attempted);
        info!("Files Successful: {}", self.total_files_successful);
        info!("Files Failed: {}", self.total_files_failed);
        info!("Records Built: {}", self.total_records_built);
        info!("Entries Outside Allow-List: {}", self.entries_outside_allow_list);
        info!("Misaligned Entries (truncated): {}", self.misaligned_entries);
        info!("Bytes Processed: {:.2} MB", self.total_bytes_processed as f64 / 1_048_576.0);
        info!("Throughput: {:.2} records/sec", self.get_throughput());

        if !self.processing_times.is_empty() {
            info!("Processing Times:");
            for (op, duration) in &self.processing_times {
                info!("  {}: {:.2?}", op, duration);
            }
        }
        info!("=============================================");
    }
}

/// Helper macro to time an operation
#[macro_export]
macro_rules! time_operation {
    ($name:expr, $op:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();
        $crate::metrics::METRICS
            .lock()
            .record_processing_time($name.to_string(), duration);
        result
    }};
}
