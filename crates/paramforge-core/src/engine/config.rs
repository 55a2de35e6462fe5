use crate::core::forcefield::config::CanonicalizationConfig;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BOND_TOLERANCE: f64 = 1.2;
pub const DEFAULT_MAX_MAPPINGS: usize = 4096;
pub const DEFAULT_TOPOLOGY_FILE: &str = "topology.json";
pub const DEFAULT_CONFORMER_SUFFIX: &str = ".qm.json";
pub const SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Settings of one dataset build.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    /// Directory holding one subdirectory per molecule.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Replace existing `<mol_id>.json` files instead of skipping them.
    pub overwrite: bool,
    /// Only molecules with a classical topology count as complete.
    pub require_topology: bool,
    /// Stop the batch at the first molecule that fails.
    pub fail_fast: bool,
    pub write_summary: bool,
    /// Scale applied to summed covalent radii during bond perception.
    pub bond_tolerance: f64,
    /// Upper bound on isomorphisms enumerated per graph pair.
    pub max_mappings: usize,
    pub topology_file_name: String,
    pub conformer_suffix: String,
    pub canonicalization: CanonicalizationConfig,
}

#[derive(Default)]
pub struct AssemblyConfigBuilder {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    overwrite: Option<bool>,
    require_topology: Option<bool>,
    fail_fast: Option<bool>,
    write_summary: Option<bool>,
    bond_tolerance: Option<f64>,
    max_mappings: Option<usize>,
    topology_file_name: Option<String>,
    conformer_suffix: Option<String>,
    canonicalization: Option<CanonicalizationConfig>,
}

impl AssemblyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_dir(mut self, path: PathBuf) -> Self {
        self.input_dir = Some(path);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }
    pub fn require_topology(mut self, required: bool) -> Self {
        self.require_topology = Some(required);
        self
    }
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = Some(fail_fast);
        self
    }
    pub fn write_summary(mut self, write: bool) -> Self {
        self.write_summary = Some(write);
        self
    }
    pub fn bond_tolerance(mut self, tolerance: f64) -> Self {
        self.bond_tolerance = Some(tolerance);
        self
    }
    pub fn max_mappings(mut self, n: usize) -> Self {
        self.max_mappings = Some(n);
        self
    }
    pub fn topology_file_name(mut self, name: impl Into<String>) -> Self {
        self.topology_file_name = Some(name.into());
        self
    }
    pub fn conformer_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.conformer_suffix = Some(suffix.into());
        self
    }
    pub fn canonicalization(mut self, config: CanonicalizationConfig) -> Self {
        self.canonicalization = Some(config);
        self
    }

    pub fn build(self) -> Result<AssemblyConfig, ConfigError> {
        let bond_tolerance = self.bond_tolerance.unwrap_or(DEFAULT_BOND_TOLERANCE);
        if !(bond_tolerance.is_finite() && bond_tolerance > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "bond_tolerance",
                reason: format!("must be a positive number, got {bond_tolerance}"),
            });
        }
        let max_mappings = self.max_mappings.unwrap_or(DEFAULT_MAX_MAPPINGS);
        if max_mappings == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_mappings",
                reason: "must be at least 1".to_string(),
            });
        }
        let conformer_suffix = self
            .conformer_suffix
            .unwrap_or_else(|| DEFAULT_CONFORMER_SUFFIX.to_string());
        if conformer_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "conformer_suffix",
                reason: "must not be empty".to_string(),
            });
        }
        let canonicalization = self.canonicalization.unwrap_or_default();
        canonicalization
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                name: "canonicalization",
                reason: e.to_string(),
            })?;

        Ok(AssemblyConfig {
            input_dir: self
                .input_dir
                .ok_or(ConfigError::MissingParameter("input_dir"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            overwrite: self.overwrite.unwrap_or(false),
            require_topology: self.require_topology.unwrap_or(true),
            fail_fast: self.fail_fast.unwrap_or(false),
            write_summary: self.write_summary.unwrap_or(true),
            bond_tolerance,
            max_mappings,
            topology_file_name: self
                .topology_file_name
                .unwrap_or_else(|| DEFAULT_TOPOLOGY_FILE.to_string()),
            conformer_suffix,
            canonicalization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_applies_defaults() {
        let config = AssemblyConfigBuilder::new()
            .input_dir("in".into())
            .output_dir("out".into())
            .build()
            .unwrap();
        assert!(!config.overwrite);
        assert!(config.require_topology);
        assert!(config.write_summary);
        assert_eq!(config.bond_tolerance, DEFAULT_BOND_TOLERANCE);
        assert_eq!(config.topology_file_name, "topology.json");
        assert_eq!(config.conformer_suffix, ".qm.json");
        assert_eq!(config.canonicalization, CanonicalizationConfig::default());
    }

    #[test]
    fn build_requires_directories() {
        let err = AssemblyConfigBuilder::new()
            .output_dir("out".into())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("input_dir"));
    }

    #[test]
    fn build_rejects_invalid_values() {
        let err = AssemblyConfigBuilder::new()
            .input_dir("in".into())
            .output_dir("out".into())
            .bond_tolerance(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "bond_tolerance",
                ..
            }
        ));

        let err = AssemblyConfigBuilder::new()
            .input_dir("in".into())
            .output_dir("out".into())
            .canonicalization(CanonicalizationConfig {
                central_idx: 7,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "canonicalization",
                ..
            }
        ));
    }
}
