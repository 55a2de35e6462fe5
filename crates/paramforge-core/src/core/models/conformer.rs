use super::graph::{GraphError, MolecularGraph, apply_permutation};
use crate::core::graph::perception::perceive_bonds;
use nalgebra::{Point3, Vector3};
use std::path::PathBuf;

/// A single geometry with its (optional) quantum-chemical energy and gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    pub positions: Vec<Point3<f64>>,
    pub energy: Option<f64>,
    pub gradient: Option<Vec<Vector3<f64>>>,
}

impl Conformer {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            energy: None,
            gradient: None,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_gradient(mut self, gradient: Vec<Vector3<f64>>) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// A conformer contributes to a dataset only when positions, energy and
    /// gradient are all present and shaped for `n_atoms`.
    pub fn is_complete(&self, n_atoms: usize) -> bool {
        self.positions.len() == n_atoms
            && self.energy.is_some()
            && self.gradient.as_ref().is_some_and(|g| g.len() == n_atoms)
    }

    pub fn permuted(&self, permutation: &[usize]) -> Self {
        Self {
            positions: apply_permutation(&self.positions, permutation),
            energy: self.energy,
            gradient: self
                .gradient
                .as_ref()
                .map(|g| apply_permutation(g, permutation)),
        }
    }
}

/// All conformers read from one source file, sharing one atom ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformerSource {
    pub origin: PathBuf,
    pub atomic_numbers: Vec<u8>,
    pub bonds: Option<Vec<(usize, usize)>>,
    pub conformers: Vec<Conformer>,
}

impl ConformerSource {
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atomic_numbers.len()
    }

    /// Builds the connectivity graph of this source.
    ///
    /// Explicit bonds take precedence; otherwise bonds are perceived from the
    /// last conformer, which for optimization trajectories is the relaxed one.
    pub fn graph(&self, bond_tolerance: f64) -> Result<MolecularGraph, GraphError> {
        match (&self.bonds, self.conformers.last()) {
            (Some(bonds), _) => MolecularGraph::new(self.atomic_numbers.clone(), bonds),
            (None, Some(last)) => {
                let bonds = perceive_bonds(&self.atomic_numbers, &last.positions, bond_tolerance);
                MolecularGraph::new(self.atomic_numbers.clone(), &bonds)
            }
            (None, None) => MolecularGraph::new(self.atomic_numbers.clone(), &[]),
        }
    }
}
