use serde::{Deserialize, Serialize};

/// How atoms are referenced by the tuples of a [`RawParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Addressing {
    /// Positions into the topology's atom list.
    #[default]
    Index,
    /// Atom ids as stored in the topology.
    AtomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBond {
    pub atoms: [u32; 2],
    pub k: f64,
    pub eq: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAngle {
    pub atoms: [u32; 3],
    pub k: f64,
    pub eq: f64,
}

/// One Fourier term of a torsion. The same physical torsion may appear
/// several times with different periodicities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTorsion {
    pub atoms: [u32; 4],
    pub periodicity: u32,
    pub phase: f64,
    pub k: f64,
}

/// Unordered interaction parameters as emitted by a classical evaluator.
///
/// The lists may be a superset of what a topology requires. Torsions are not
/// split into propers and impropers; that is decided from connectivity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawParameterSet {
    #[serde(default)]
    pub addressing: Addressing,
    #[serde(default)]
    pub bonds: Vec<RawBond>,
    #[serde(default)]
    pub angles: Vec<RawAngle>,
    #[serde(default)]
    pub torsions: Vec<RawTorsion>,
}

impl RawBond {
    pub fn new(atoms: [u32; 2], k: f64, eq: f64) -> Self {
        Self { atoms, k, eq }
    }
}

impl RawAngle {
    pub fn new(atoms: [u32; 3], k: f64, eq: f64) -> Self {
        Self { atoms, k, eq }
    }
}

impl RawTorsion {
    pub fn new(atoms: [u32; 4], periodicity: u32, phase: f64, k: f64) -> Self {
        Self {
            atoms,
            periodicity,
            phase,
            k,
        }
    }
}
