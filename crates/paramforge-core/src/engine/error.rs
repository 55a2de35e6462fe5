use thiserror::Error;

use super::config::ConfigError;
use crate::core::forcefield::error::CanonicalizationError;
use crate::core::graph::matcher::MatchError;
use crate::core::io::error::IoError;
use crate::core::topology::molecule::TopologyError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O failure: {source}")]
    Io {
        #[from]
        source: IoError,
    },

    #[error("Failed to access '{}': {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write summary '{}': {source}", .path.display())]
    Summary { path: PathBuf, source: csv::Error },

    #[error("Molecule '{mol_id}' has an invalid topology: {source}")]
    Topology {
        mol_id: String,
        source: TopologyError,
    },

    #[error("Molecule '{mol_id}' could not be matched to its topology: {source}")]
    Match { mol_id: String, source: MatchError },

    #[error("Parameter canonicalization failed for molecule '{mol_id}': {source}")]
    Canonicalization {
        mol_id: String,
        source: CanonicalizationError,
    },

    #[error("Output '{}' already exists", .path.display())]
    OutputExists { path: PathBuf },
}

impl AssemblyError {
    /// Short label used to count failures in the build summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Io { .. } | Self::FileSystem { .. } | Self::Summary { .. } => "io",
            Self::Topology { .. } => "malformed-input",
            Self::Match { .. } => "match-failure",
            Self::Canonicalization { source, .. } => source.kind().as_str(),
            Self::OutputExists { .. } => "output-exists",
        }
    }
}
