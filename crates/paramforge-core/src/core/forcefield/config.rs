use super::error::CanonicalizationError;
use crate::core::topology::molecule::DEFAULT_CENTRAL_IDX;
use serde::{Deserialize, Serialize};

pub const DEFAULT_N_PERIODICITY_PROPER: usize = 6;
pub const DEFAULT_N_PERIODICITY_IMPROPER: usize = 3;
pub const DEFAULT_PHASE_TOLERANCE: f64 = 1e-2;

/// Settings consumed by the parameter canonicalizer.
///
/// The value is immutable once handed to a canonicalizer; validation happens
/// at construction of the canonicalizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CanonicalizationConfig {
    pub n_periodicity_proper: usize,
    pub n_periodicity_improper: usize,
    pub central_idx: usize,
    pub allow_skip_improper: bool,
    pub phase_tolerance: f64,
}

impl Default for CanonicalizationConfig {
    fn default() -> Self {
        Self {
            n_periodicity_proper: DEFAULT_N_PERIODICITY_PROPER,
            n_periodicity_improper: DEFAULT_N_PERIODICITY_IMPROPER,
            central_idx: DEFAULT_CENTRAL_IDX,
            allow_skip_improper: false,
            phase_tolerance: DEFAULT_PHASE_TOLERANCE,
        }
    }
}

impl CanonicalizationConfig {
    pub fn validate(&self) -> Result<(), CanonicalizationError> {
        if self.n_periodicity_proper == 0 {
            return Err(invalid("n-periodicity-proper", "must be at least 1"));
        }
        if self.n_periodicity_improper == 0 {
            return Err(invalid("n-periodicity-improper", "must be at least 1"));
        }
        if self.central_idx > 3 {
            return Err(invalid(
                "central-idx",
                format!("must be within 0..=3, got {}", self.central_idx),
            ));
        }
        if !(self.phase_tolerance.is_finite() && self.phase_tolerance >= 0.0) {
            return Err(invalid(
                "phase-tolerance",
                format!("must be a non-negative number, got {}", self.phase_tolerance),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> CanonicalizationError {
    CanonicalizationError::InvalidConfig {
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CanonicalizationConfig::default();
        assert_eq!(config.n_periodicity_proper, 6);
        assert_eq!(config.n_periodicity_improper, 3);
        assert_eq!(config.central_idx, 2);
        assert!(!config.allow_skip_improper);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let config = CanonicalizationConfig {
            central_idx: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CanonicalizationError::InvalidConfig {
                name: "central-idx",
                ..
            })
        ));

        let config = CanonicalizationConfig {
            phase_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CanonicalizationConfig {
            n_periodicity_proper: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
