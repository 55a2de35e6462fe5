use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "paramforge CLI - Builds canonical molecular-mechanics datasets from quantum-chemistry conformers and classical force-field parameters.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble one canonical record per molecule directory.
    Build(BuildArgs),
    /// Print the contents of a canonical record.
    Inspect(InspectArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    // --- Core Arguments ---
    /// Directory holding one subdirectory per molecule.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory receiving `<mol_id>.json` records and `summary.csv`.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Output Overrides ---
    /// Replace records that already exist in the output directory.
    #[arg(long)]
    pub overwrite: bool,

    /// Abort the whole batch at the first molecule that fails.
    #[arg(long)]
    pub fail_fast: bool,

    /// Do not write `summary.csv`.
    #[arg(long)]
    pub no_summary: bool,

    /// Override `assembly.require-topology` from the config file.
    #[command(flatten)]
    pub topology_requirement: TopologyRequirement,

    // --- Matching Overrides ---
    /// Override the covalent-radius scale used for bond perception.
    #[arg(long, value_name = "FLOAT")]
    pub bond_tolerance: Option<f64>,

    /// Override the cap on isomorphisms enumerated per graph pair.
    #[arg(long, value_name = "INT")]
    pub max_mappings: Option<usize>,

    // --- Canonicalization Overrides ---
    /// Override the number of proper torsion periodicity columns.
    #[arg(long, value_name = "INT")]
    pub n_periodicity_proper: Option<usize>,

    /// Override the number of improper torsion periodicity columns.
    #[arg(long, value_name = "INT")]
    pub n_periodicity_improper: Option<usize>,

    /// Drop improper terms that match no canonical improper instead of failing.
    #[arg(long)]
    pub allow_skip_improper: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S canonicalization.phase-tolerance=0.05
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive flags for the topology requirement.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct TopologyRequirement {
    /// Only write molecules that have a classical topology.
    #[arg(long)]
    pub require_topology: bool,
    /// Write molecules without a classical topology with placeholder parameters.
    #[arg(long)]
    pub allow_missing_topology: bool,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to a `<mol_id>.json` record.
    #[arg(required = true, value_name = "PATH")]
    pub record: PathBuf,

    /// Also print the torsion force constants in signed form.
    #[arg(long)]
    pub signed: bool,

    /// Pad or truncate the signed tables to this many periodicity columns.
    #[arg(long, value_name = "INT", requires = "signed")]
    pub periodicity: Option<usize>,

    /// Report rows whose phase is not a multiple of pi as missing instead of failing.
    #[arg(long, requires = "signed")]
    pub allow_missing: bool,
}
