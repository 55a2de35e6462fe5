use super::error::IoError;
use crate::core::forcefield::raw::RawParameterSet;
use crate::core::models::conformer::{Conformer, ConformerSource};
use crate::core::models::element::atomic_number;
use crate::core::models::graph::{GraphError, MolecularGraph};
use crate::core::models::ids::AtomId;
use crate::core::topology::molecule::{MoleculeTopology, TopologyError};
use crate::core::topology::tuples::InteractionClass;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An element given either by symbol or by atomic number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementLabel {
    Number(u8),
    Symbol(String),
}

impl ElementLabel {
    pub fn atomic_number(&self) -> Option<u8> {
        match self {
            Self::Number(z) if (1..=118).contains(z) => Some(*z),
            Self::Number(_) => None,
            Self::Symbol(symbol) => atomic_number(symbol),
        }
    }
}

fn resolve_elements(path: &Path, labels: &[ElementLabel]) -> Result<Vec<u8>, IoError> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            label
                .atomic_number()
                .ok_or_else(|| IoError::invalid(path, format!("unknown element {label:?} at atom {i}")))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformerEntry {
    pub positions: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Vec<[f64; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forces: Option<Vec<[f64; 3]>>,
}

/// On-disk layout of a quantum-chemistry conformer file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformerFile {
    pub elements: Vec<ElementLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonds: Option<Vec<[usize; 2]>>,
    pub conformers: Vec<ConformerEntry>,
}

impl ConformerFile {
    /// Converts the file into a [`ConformerSource`].
    ///
    /// A `gradient` entry takes precedence over `forces`; forces are negated
    /// into a gradient.
    ///
    /// # Errors
    ///
    /// Fails on unknown elements, bond indices out of range, or per-conformer
    /// arrays whose length differs from the number of atoms.
    pub fn into_source(self, origin: &Path) -> Result<ConformerSource, IoError> {
        let atomic_numbers = resolve_elements(origin, &self.elements)?;
        let n_atoms = atomic_numbers.len();

        let bonds = match self.bonds {
            Some(bonds) => {
                if let Some([i, j]) = bonds.iter().find(|[i, j]| *i >= n_atoms || *j >= n_atoms) {
                    return Err(IoError::invalid(
                        origin,
                        format!("bond ({i}, {j}) references an atom outside 0..{n_atoms}"),
                    ));
                }
                Some(bonds.into_iter().map(|[i, j]| (i, j)).collect())
            }
            None => None,
        };

        let conformers = self
            .conformers
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_conformer(origin, index, n_atoms))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConformerSource {
            origin: origin.to_path_buf(),
            atomic_numbers,
            bonds,
            conformers,
        })
    }
}

impl ConformerEntry {
    fn into_conformer(
        self,
        origin: &Path,
        index: usize,
        n_atoms: usize,
    ) -> Result<Conformer, IoError> {
        let check = |what: &str, len: usize| {
            if len == n_atoms {
                Ok(())
            } else {
                Err(IoError::invalid(
                    origin,
                    format!("conformer {index} has {len} {what} for {n_atoms} atoms"),
                ))
            }
        };

        check("positions", self.positions.len())?;
        let positions = self
            .positions
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();

        let gradient = match (self.gradient, self.forces) {
            (Some(gradient), _) => {
                check("gradient rows", gradient.len())?;
                Some(gradient.iter().map(|&[x, y, z]| Vector3::new(x, y, z)).collect())
            }
            (None, Some(forces)) => {
                check("force rows", forces.len())?;
                Some(forces.iter().map(|&[x, y, z]| -Vector3::new(x, y, z)).collect())
            }
            (None, None) => None,
        };

        Ok(Conformer {
            positions,
            energy: self.energy,
            gradient,
        })
    }
}

/// On-disk layout of a classical topology file; bonds are addressed by atom id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyFile {
    pub atoms: Vec<AtomId>,
    pub elements: Vec<ElementLabel>,
    pub bonds: Vec<[AtomId; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_charges: Option<Vec<f64>>,
    #[serde(default)]
    pub parameters: RawParameterSet,
}

/// A validated classical description of one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalTopology {
    pub origin: PathBuf,
    pub atoms: Vec<AtomId>,
    pub atomic_numbers: Vec<u8>,
    pub bonds: Vec<(AtomId, AtomId)>,
    pub partial_charges: Option<Vec<f64>>,
    pub parameters: RawParameterSet,
}

impl TopologyFile {
    /// # Errors
    ///
    /// Fails when the element or partial-charge lists do not match the atom
    /// list, or an element is unknown.
    pub fn into_topology(self, origin: &Path) -> Result<ClassicalTopology, IoError> {
        let n_atoms = self.atoms.len();
        if self.elements.len() != n_atoms {
            return Err(IoError::invalid(
                origin,
                format!("{} elements for {n_atoms} atoms", self.elements.len()),
            ));
        }
        if let Some(charges) = &self.partial_charges {
            if charges.len() != n_atoms {
                return Err(IoError::invalid(
                    origin,
                    format!("{} partial charges for {n_atoms} atoms", charges.len()),
                ));
            }
        }
        Ok(ClassicalTopology {
            origin: origin.to_path_buf(),
            atomic_numbers: resolve_elements(origin, &self.elements)?,
            atoms: self.atoms,
            bonds: self.bonds.into_iter().map(|[a, b]| (a, b)).collect(),
            partial_charges: self.partial_charges,
            parameters: self.parameters,
        })
    }
}

impl ClassicalTopology {
    pub fn molecule_topology(&self, central_idx: usize) -> Result<MoleculeTopology, TopologyError> {
        MoleculeTopology::from_connectivity(self.atoms.clone(), &self.bonds, central_idx)
    }

    /// Connectivity graph over atom positions in [`atoms`](Self::atoms) order.
    pub fn graph(&self) -> Result<MolecularGraph, TopologyError> {
        let position = |atom: AtomId| {
            self.atoms
                .iter()
                .position(|&a| a == atom)
                .ok_or(TopologyError::UnknownAtom {
                    atom,
                    class: InteractionClass::Bond,
                })
        };
        let edges = self
            .bonds
            .iter()
            .map(|&(a, b)| Ok((position(a)?, position(b)?)))
            .collect::<Result<Vec<_>, TopologyError>>()?;
        MolecularGraph::new(self.atomic_numbers.clone(), &edges).map_err(|e| match e {
            GraphError::SelfLoop(i) => TopologyError::SelfBond(self.atoms[i]),
            GraphError::EdgeOutOfBounds { i, .. } => TopologyError::UnknownAtom {
                atom: AtomId(i as u32),
                class: InteractionClass::Bond,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_labels_accept_symbols_and_numbers() {
        let labels: Vec<ElementLabel> = serde_json::from_str(r#"["C", 8, "cl", 0]"#).unwrap();
        let numbers: Vec<_> = labels.iter().map(ElementLabel::atomic_number).collect();
        assert_eq!(numbers, vec![Some(6), Some(8), Some(17), None]);
    }

    #[test]
    fn forces_become_negated_gradient() {
        let json = r#"{
            "elements": ["H", "H"],
            "conformers": [
                { "positions": [[0, 0, 0], [0.74, 0, 0]], "energy": -1.17,
                  "forces": [[0.5, 0, 0], [-0.5, 0, 0]] }
            ]
        }"#;
        let file: ConformerFile = serde_json::from_str(json).unwrap();
        let source = file.into_source(Path::new("h2.qm.json")).unwrap();
        let gradient = source.conformers[0].gradient.as_ref().unwrap();
        assert_eq!(gradient[0], Vector3::new(-0.5, 0.0, 0.0));
        assert_eq!(source.atomic_numbers, vec![1, 1]);
        assert!(source.bonds.is_none());
    }

    #[test]
    fn mismatched_conformer_lengths_are_rejected() {
        let json = r#"{
            "elements": ["H", "H"],
            "conformers": [{ "positions": [[0, 0, 0]] }]
        }"#;
        let file: ConformerFile = serde_json::from_str(json).unwrap();
        let err = file.into_source(Path::new("bad.qm.json")).unwrap_err();
        assert!(matches!(err, IoError::InvalidContent { .. }));
    }

    #[test]
    fn out_of_range_bond_is_rejected() {
        let file = ConformerFile {
            elements: vec![ElementLabel::Number(1), ElementLabel::Number(1)],
            bonds: Some(vec![[0, 2]]),
            conformers: vec![],
        };
        assert!(file.into_source(Path::new("x.qm.json")).is_err());
    }

    #[test]
    fn topology_file_builds_graph_in_atom_order() {
        let json = r#"{
            "atoms": [10, 20, 30],
            "elements": ["O", "H", "H"],
            "bonds": [[10, 20], [30, 10]],
            "partial_charges": [-0.8, 0.4, 0.4],
            "parameters": { "addressing": "atom-id" }
        }"#;
        let file: TopologyFile = serde_json::from_str(json).unwrap();
        let topology = file.into_topology(Path::new("topology.json")).unwrap();
        let graph = topology.graph().unwrap();
        assert_eq!(graph.labels(), &[8, 1, 1]);
        assert_eq!(graph.edges(), &[(0, 1), (0, 2)]);
        let molecule = topology.molecule_topology(2).unwrap();
        assert_eq!(molecule.angles().len(), 1);
    }

    #[test]
    fn topology_file_checks_list_lengths() {
        let file = TopologyFile {
            atoms: vec![AtomId(0), AtomId(1)],
            elements: vec![ElementLabel::Number(1)],
            bonds: vec![],
            partial_charges: None,
            parameters: RawParameterSet::default(),
        };
        assert!(file.into_topology(Path::new("topology.json")).is_err());
    }
}
