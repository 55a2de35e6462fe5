use crate::core::topology::tuples::InteractionClass;
use std::fmt;
use thiserror::Error;

/// Coarse classification of canonicalization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    MalformedInput,
    SymmetryConflict,
    PeriodicityOverflow,
    UnrepresentablePhase,
    MatchFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed-input",
            Self::SymmetryConflict => "symmetry-conflict",
            Self::PeriodicityOverflow => "periodicity-overflow",
            Self::UnrepresentablePhase => "unrepresentable-phase",
            Self::MatchFailure => "match-failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanonicalizationError {
    #[error("Malformed {class} input: {detail}")]
    MalformedInput {
        class: InteractionClass,
        detail: String,
    },
    #[error(
        "Conflicting {class} parameters for {tuple:?} at periodicity {periodicity}: {detail}"
    )]
    SymmetryConflict {
        class: InteractionClass,
        tuple: Vec<u32>,
        periodicity: u32,
        detail: String,
    },
    #[error("Periodicity {periodicity} of {class} {tuple:?} is outside 1..={max}")]
    PeriodicityOverflow {
        class: InteractionClass,
        tuple: Vec<u32>,
        periodicity: u32,
        max: usize,
    },
    #[error("Phase {phase} of {class} row {row} is not a multiple of pi")]
    UnrepresentablePhase {
        class: InteractionClass,
        row: usize,
        phase: f64,
    },
    #[error("No canonical {class} matches raw tuple {tuple:?}")]
    MatchFailure {
        class: InteractionClass,
        tuple: Vec<u32>,
    },
    #[error(
        "Improper {tuple:?} has its central atom at slot {raw_slot}, which cannot be mapped onto slot {central_idx}"
    )]
    IncompatibleCentralSlot {
        tuple: Vec<u32>,
        raw_slot: usize,
        central_idx: usize,
    },
    #[error("Invalid canonicalization setting '{name}': {reason}")]
    InvalidConfig { name: &'static str, reason: String },
}

impl CanonicalizationError {
    /// Maps the error onto its policy class.
    ///
    /// Configuration errors count as malformed input; a central
    /// slot incompatibility is a match failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { .. } | Self::InvalidConfig { .. } => ErrorKind::MalformedInput,
            Self::SymmetryConflict { .. } => ErrorKind::SymmetryConflict,
            Self::PeriodicityOverflow { .. } => ErrorKind::PeriodicityOverflow,
            Self::UnrepresentablePhase { .. } => ErrorKind::UnrepresentablePhase,
            Self::MatchFailure { .. } | Self::IncompatibleCentralSlot { .. } => {
                ErrorKind::MatchFailure
            }
        }
    }

    pub(crate) fn malformed(class: InteractionClass, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            class,
            detail: detail.into(),
        }
    }
}
