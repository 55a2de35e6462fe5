use super::defaults::DefaultsConfig;
use super::file::{FileCanonicalizationConfig, FileConfig};
use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use paramforge::core::forcefield::config::CanonicalizationConfig;
use paramforge::engine::config as core_config;
use std::str::FromStr;

/// Merges defaults, the optional config file, `-S` overrides and explicit
/// flags, in increasing order of precedence.
pub fn build_config(args: &BuildArgs) -> Result<core_config::AssemblyConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let assembly = file_config.assembly.take().unwrap_or_default();
    let matching = file_config.matching.take().unwrap_or_default();
    let canonicalization = merge_canonicalization(
        file_config.canonicalization.take().unwrap_or_default(),
        args,
        &defaults,
    );

    let require_topology = match (
        args.topology_requirement.require_topology,
        args.topology_requirement.allow_missing_topology,
    ) {
        (true, false) => true,
        (false, true) => false,
        _ => assembly
            .require_topology
            .unwrap_or(defaults.require_topology),
    };

    core_config::AssemblyConfigBuilder::new()
        .input_dir(args.input.clone())
        .output_dir(args.output.clone())
        .overwrite(args.overwrite || assembly.overwrite.unwrap_or(defaults.overwrite))
        .fail_fast(args.fail_fast || assembly.fail_fast.unwrap_or(defaults.fail_fast))
        .write_summary(
            !args.no_summary && assembly.write_summary.unwrap_or(defaults.write_summary),
        )
        .require_topology(require_topology)
        .topology_file_name(assembly.topology_file.unwrap_or(defaults.topology_file))
        .conformer_suffix(
            assembly
                .conformer_suffix
                .unwrap_or(defaults.conformer_suffix),
        )
        .bond_tolerance(
            args.bond_tolerance
                .or(matching.bond_tolerance)
                .unwrap_or(defaults.bond_tolerance),
        )
        .max_mappings(
            args.max_mappings
                .or(matching.max_mappings)
                .unwrap_or(defaults.max_mappings),
        )
        .canonicalization(canonicalization)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn merge_canonicalization(
    file_val: FileCanonicalizationConfig,
    args: &BuildArgs,
    defaults: &DefaultsConfig,
) -> CanonicalizationConfig {
    let base = defaults.canonicalization;
    CanonicalizationConfig {
        n_periodicity_proper: args
            .n_periodicity_proper
            .or(file_val.n_periodicity_proper)
            .unwrap_or(base.n_periodicity_proper),
        n_periodicity_improper: args
            .n_periodicity_improper
            .or(file_val.n_periodicity_improper)
            .unwrap_or(base.n_periodicity_improper),
        central_idx: file_val.central_idx.unwrap_or(base.central_idx),
        allow_skip_improper: args.allow_skip_improper
            || file_val
                .allow_skip_improper
                .unwrap_or(base.allow_skip_improper),
        phase_tolerance: file_val.phase_tolerance.unwrap_or(base.phase_tolerance),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "assembly.overwrite" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .overwrite = Some(parse_value(key, value_str, "boolean")?);
            }
            "assembly.require-topology" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .require_topology = Some(parse_value(key, value_str, "boolean")?);
            }
            "assembly.fail-fast" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .fail_fast = Some(parse_value(key, value_str, "boolean")?);
            }
            "assembly.write-summary" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .write_summary = Some(parse_value(key, value_str, "boolean")?);
            }
            "assembly.topology-file" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .topology_file = Some(value_str.to_string());
            }
            "assembly.conformer-suffix" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .conformer_suffix = Some(value_str.to_string());
            }
            "matching.bond-tolerance" => {
                config
                    .matching
                    .get_or_insert_with(Default::default)
                    .bond_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            "matching.max-mappings" => {
                config
                    .matching
                    .get_or_insert_with(Default::default)
                    .max_mappings = Some(parse_value(key, value_str, "integer")?);
            }
            "canonicalization.n-periodicity-proper" => {
                config
                    .canonicalization
                    .get_or_insert_with(Default::default)
                    .n_periodicity_proper = Some(parse_value(key, value_str, "integer")?);
            }
            "canonicalization.n-periodicity-improper" => {
                config
                    .canonicalization
                    .get_or_insert_with(Default::default)
                    .n_periodicity_improper = Some(parse_value(key, value_str, "integer")?);
            }
            "canonicalization.central-idx" => {
                config
                    .canonicalization
                    .get_or_insert_with(Default::default)
                    .central_idx = Some(parse_value(key, value_str, "integer")?);
            }
            "canonicalization.allow-skip-improper" => {
                config
                    .canonicalization
                    .get_or_insert_with(Default::default)
                    .allow_skip_improper = Some(parse_value(key, value_str, "boolean")?);
            }
            "canonicalization.phase-tolerance" => {
                config
                    .canonicalization
                    .get_or_insert_with(Default::default)
                    .phase_tolerance = Some(parse_value(key, value_str, "float")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
