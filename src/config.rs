use crate::errors::ConfigError;
use crate::identity::IdentityResolver;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Pipeline settings. Every field has a default so a config file only needs
/// to name what it changes.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PipelineConfig {
    /// Exact `measObjLdn` values to keep. Empty keeps every object instance.
    #[serde(default)]
    pub allowed_object_dns: Vec<String>,
    /// Case-insensitive substrings; a row is kept when its cell id contains
    /// any of them. Empty keeps every cell.
    #[serde(default)]
    pub cell_selectors: Vec<String>,
    /// Rows whose cell id does not match this pattern were not resolved to a
    /// cell and are dropped.
    #[serde(default = "default_cell_pattern")]
    pub cell_pattern: String,
    /// Counter columns starting with this prefix are diagnostics, not metrics.
    #[serde(default = "default_trace_prefix")]
    pub trace_prefix: String,
    /// Only affects diagnostic output.
    #[serde(default)]
    pub debug: bool,
}

fn default_cell_pattern() -> String {
    "Cell".to_string()
}

fn default_trace_prefix() -> String {
    "TraceDU.".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_object_dns: Vec::new(),
            cell_selectors: Vec::new(),
            cell_pattern: default_cell_pattern(),
            trace_prefix: default_trace_prefix(),
            debug: false,
        }
    }
}

impl PipelineConfig {
    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::with_allow_list(self.allowed_object_dns.iter().cloned())
    }

    /// Default log filter; `RUST_LOG` still overrides it.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    pub fn cell_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.cell_pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: self.cell_pattern.clone(),
            source,
        })
    }
}

/// Loads the pipeline configuration from a JSON file.
pub fn load_config(path_str: &str) -> Result<PipelineConfig, ConfigError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let file = File::open(&path).map_err(|e| ConfigError::IoError {
        path: path.clone(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: PipelineConfig = serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
        path: path.clone(),
        source: e,
    })?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);

    // Fail early on a bad pattern rather than on first use
    config.cell_regex()?;
    Ok(config)
}
