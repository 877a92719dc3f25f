//! Turns parsed measurement blocks into flat per-cell records.

use log::debug;

use crate::data_models::{CellRecord, CounterValue};
use crate::identity::IdentityResolver;
use crate::metrics::METRICS;
use crate::models::{MeasResults, MeasurementBlock, MeasurementDocument, ValueEntry};
use crate::utils::{coerce_counter_value, normalize_end_time};
use crate::validation::check_alignment;

/// Builds one record per permitted value entry of every block in the document.
pub fn build_rows(document: &MeasurementDocument, resolver: &IdentityResolver) -> Vec<CellRecord> {
    let mut records = Vec::new();
    for block in &document.blocks {
        let end_time = normalize_end_time(&block.granularity_end_time);
        for entry in &block.value_entries {
            if !resolver.permits(&entry.object_dn) {
                METRICS.lock().record_outside_allow_list();
                continue;
            }

            let alignment = check_alignment(block, entry);
            if !alignment.is_exact() {
                debug!(
                    "{}: '{}' does not line up with its measInfo ({:?}), pairing what matches",
                    document.filename, entry.object_dn, alignment
                );
                METRICS.lock().record_misaligned_entry();
            }

            let identity = resolver.resolve(&entry.object_dn);
            records.push(CellRecord {
                cell_id: identity.cell_id,
                serial: identity.serial,
                source_filename: document.filename.clone(),
                source_name: document.source_name.clone(),
                granularity_duration: block.granularity_duration.clone(),
                granularity_end_time: block.granularity_end_time.clone(),
                granularity_end_time_fmt: end_time.datetime.clone(),
                granularity_end_time_display: end_time.display.clone(),
                values: align_counters(block, entry),
            });
        }
    }
    records
}

/// Pairs counter names with result values.
///
/// Positional results are zipped and truncated to the shorter side; unmatched
/// trailing names or values are dropped, never padded. Keyed results are
/// matched by `p` id in the block's declaration order.
pub fn align_counters(block: &MeasurementBlock, entry: &ValueEntry) -> Vec<(String, CounterValue)> {
    let mut record = CellRecord::default();
    match &entry.results {
        MeasResults::Positional(values) => {
            for (name, raw) in block.counter_names.iter().zip(values) {
                record.set(name, coerce_counter_value(raw));
            }
        }
        MeasResults::Keyed(pairs) => {
            for (position, name) in block.counter_positions.iter().zip(&block.counter_names) {
                if let Some((_, raw)) = pairs.iter().find(|(p, _)| p == position) {
                    record.set(name, coerce_counter_value(raw));
                }
            }
        }
    }
    record.values
}
