use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAssemblyConfig {
    pub overwrite: Option<bool>,
    pub require_topology: Option<bool>,
    pub fail_fast: Option<bool>,
    pub write_summary: Option<bool>,
    pub topology_file: Option<String>,
    pub conformer_suffix: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMatchingConfig {
    pub bond_tolerance: Option<f64>,
    pub max_mappings: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCanonicalizationConfig {
    pub n_periodicity_proper: Option<usize>,
    pub n_periodicity_improper: Option<usize>,
    pub central_idx: Option<usize>,
    pub allow_skip_improper: Option<bool>,
    pub phase_tolerance: Option<f64>,
}

/// Every setting a TOML configuration file may carry; all are optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub assembly: Option<FileAssemblyConfig>,
    pub matching: Option<FileMatchingConfig>,
    pub canonicalization: Option<FileCanonicalizationConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
