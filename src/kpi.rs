//! Derived network KPIs computed from base counters of the same row.

use log::{debug, info};

use crate::data_models::{CellRecord, CounterValue, UnifiedDataset};

/// One catalog entry: `sum(numerator) / sum(denominator) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiDefinition {
    pub name: &'static str,
    pub numerator: &'static [&'static str],
    pub denominator: &'static [&'static str],
    pub scale: f64,
}

impl KpiDefinition {
    pub fn inputs(&self) -> impl Iterator<Item = &'static str> {
        self.numerator.iter().chain(self.denominator.iter()).copied()
    }

    /// Whether every input column exists anywhere in the dataset.
    pub fn is_available(&self, dataset: &UnifiedDataset) -> bool {
        self.inputs().all(|column| dataset.has_column(column))
    }

    /// Value for one row under the safe-division policy.
    pub fn evaluate(&self, record: &CellRecord) -> f64 {
        let numerator = sum_terms(record, self.numerator);
        let denominator = sum_terms(record, self.denominator);
        match (numerator, denominator) {
            (Some(n), Some(d)) => safe_ratio(n, d, self.scale),
            _ => 0.0,
        }
    }
}

pub const KPI_CATALOG: [KpiDefinition; 10] = [
    KpiDefinition {
        name: "DL R-BLER",
        numerator: &["TB.ResidualErrNbrDl"],
        denominator: &["TB.TotNbrDlInitial"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "UL R-BLER",
        numerator: &["TB.ResidualErrNbrUl"],
        denominator: &["TB.TotNbrUlInit"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "RAR Success Rate (%)",
        numerator: &["RACH.NumMsg2Att"],
        denominator: &["RACH.NumMsg1Rcvd"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "RACH CBRA Success Rate (%)",
        numerator: &["RACH.NumMsg2SuccGrpA", "RACH.NumMsg2SuccGrpB"],
        denominator: &["RACH.NumMsg1RcvdGrpA", "RACH.NumMsg1RcvdGrpB"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "RACH CFRA Success Rate (%)",
        numerator: &["RACH.NumMsg2SuccDed"],
        denominator: &["RACH.NumMsg1RcvdDed"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "RACH Success Rate (%)",
        numerator: &["RACH.NumMsg2Succ"],
        denominator: &["RACH.NumMsg1Rcvd"],
        scale: 100.0,
    },
    KpiDefinition {
        name: "DRB Cell Throughput Uplink (kbps)",
        numerator: &["DRB.CellVolUl"],
        denominator: &["DRB.CellTimeUl"],
        scale: 1000.0,
    },
    KpiDefinition {
        name: "DRB Cell Throughput Downlink (kbps)",
        numerator: &["DRB.CellVolDl"],
        denominator: &["DRB.CellTimeDl"],
        scale: 1000.0,
    },
    KpiDefinition {
        name: "DRB UE Throughput Uplink (kbps)",
        numerator: &["DRB.UEVolUl"],
        denominator: &["DRB.UETimeUl"],
        scale: 1000.0,
    },
    KpiDefinition {
        name: "DRB UE Throughput Downlink (kbps)",
        numerator: &["DRB.UEVolDl"],
        denominator: &["DRB.UETimeDl"],
        scale: 1000.0,
    },
];

pub fn kpi_names() -> impl Iterator<Item = &'static str> {
    KPI_CATALOG.iter().map(|kpi| kpi.name)
}

/// `n / d * scale`, or 0 when the denominator is zero or the result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64, scale: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator * scale;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sum of the named counters; `None` if any is missing or not numeric.
fn sum_terms(record: &CellRecord, terms: &[&str]) -> Option<f64> {
    terms
        .iter()
        .map(|term| record.get(term).and_then(CounterValue::as_f64))
        .sum()
}

/// Adds every available catalog KPI as a column and returns the names added.
///
/// Availability is decided once for the whole dataset; a KPI whose inputs
/// are not all present is left out entirely rather than filled per row.
pub fn derive_kpis(dataset: &mut UnifiedDataset) -> Vec<String> {
    let available: Vec<&KpiDefinition> = KPI_CATALOG
        .iter()
        .filter(|kpi| {
            let ok = kpi.is_available(dataset);
            if !ok {
                debug!("KPI '{}' skipped: input columns missing", kpi.name);
            }
            ok
        })
        .collect();

    for record in &mut dataset.records {
        for kpi in &available {
            let value = kpi.evaluate(record);
            record.set(kpi.name, CounterValue::Float(value));
        }
    }

    let names: Vec<String> = available.iter().map(|kpi| kpi.name.to_string()).collect();
    for name in &names {
        if !dataset.kpi_columns.contains(name) {
            dataset.kpi_columns.push(name.clone());
        }
    }
    info!("Derived {} of {} KPIs", names.len(), KPI_CATALOG.len());
    names
}
