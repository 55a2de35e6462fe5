use paramforge::core::forcefield::config::CanonicalizationConfig;
use paramforge::engine::config as core_config;

pub struct DefaultsConfig {
    pub overwrite: bool,
    pub require_topology: bool,
    pub fail_fast: bool,
    pub write_summary: bool,
    pub topology_file: String,
    pub conformer_suffix: String,
    pub bond_tolerance: f64,
    pub max_mappings: usize,
    pub canonicalization: CanonicalizationConfig,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            require_topology: true,
            fail_fast: false,
            write_summary: true,
            topology_file: core_config::DEFAULT_TOPOLOGY_FILE.to_string(),
            conformer_suffix: core_config::DEFAULT_CONFORMER_SUFFIX.to_string(),
            bond_tolerance: core_config::DEFAULT_BOND_TOLERANCE,
            max_mappings: core_config::DEFAULT_MAX_MAPPINGS,
            canonicalization: CanonicalizationConfig::default(),
        }
    }
}
