use super::arrays::{ArrayMap, NamedArray, SchemaError};
use super::error::IoError;
use super::traits::JsonFile;
use crate::core::forcefield::parameters::{PARAMETER_ARRAYS, Parameters};
use crate::core::models::conformer::Conformer;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-molecule arrays stored next to the parameter arrays.
pub const RECORD_ARRAYS: &[&str] = &[
    "atomic_numbers",
    "xyz",
    "energy",
    "gradient",
    "partial_charges",
];

/// The canonical output of one molecule.
///
/// Conformers are stored in the atom order of the parameters' `atoms` list;
/// every conformer carries an energy and a gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct MolRecord {
    pub mol_id: String,
    pub atomic_numbers: Vec<u8>,
    pub conformers: Vec<Conformer>,
    pub partial_charges: Option<Vec<f64>>,
    pub parameters: Parameters,
}

/// On-disk layout of a [`MolRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordFile {
    pub mol_id: String,
    pub arrays: ArrayMap,
}

impl JsonFile for RecordFile {}

impl MolRecord {
    pub fn atom_count(&self) -> usize {
        self.atomic_numbers.len()
    }

    pub fn conformer_count(&self) -> usize {
        self.conformers.len()
    }

    pub fn to_file(&self) -> RecordFile {
        let n_atoms = self.atom_count();
        let n_conf = self.conformers.len();
        let mut arrays = self.parameters.to_array_map();

        arrays.insert(
            "atomic_numbers",
            NamedArray::ints(
                vec![n_atoms],
                self.atomic_numbers.iter().map(|&z| u32::from(z)).collect(),
            ),
        );
        arrays.insert(
            "xyz",
            NamedArray::dense(
                vec![n_conf, n_atoms, 3],
                self.conformers
                    .iter()
                    .flat_map(|c| c.positions.iter().flat_map(|p| [p.x, p.y, p.z])),
            ),
        );
        arrays.insert(
            "energy",
            NamedArray::floats(
                vec![n_conf],
                self.conformers.iter().map(|c| c.energy).collect(),
            ),
        );
        arrays.insert(
            "gradient",
            NamedArray::dense(
                vec![n_conf, n_atoms, 3],
                self.conformers
                    .iter()
                    .flat_map(|c| c.gradient.iter().flatten().flat_map(|g| [g.x, g.y, g.z])),
            ),
        );
        if let Some(charges) = &self.partial_charges {
            arrays.insert(
                "partial_charges",
                NamedArray::dense(vec![n_atoms], charges.iter().copied()),
            );
        }

        RecordFile {
            mol_id: self.mol_id.clone(),
            arrays,
        }
    }

    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown arrays, missing required arrays,
    /// or shapes that disagree with the atom count.
    pub fn from_file(file: RecordFile) -> Result<Self, SchemaError> {
        let allowed: Vec<&str> = RECORD_ARRAYS.iter().chain(PARAMETER_ARRAYS).copied().collect();
        file.arrays.validate(&allowed)?;
        let arrays = &file.arrays;

        let (n_atoms, numbers) = arrays.ints_with_inner("atomic_numbers", &[])?;
        let atomic_numbers = numbers
            .iter()
            .map(|&z| {
                u8::try_from(z).map_err(|_| SchemaError::Inconsistent {
                    name: "atomic_numbers".to_string(),
                    detail: format!("{z} is not an atomic number"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let positions = read_vectors(arrays, "xyz", n_atoms)?;
        let gradients = read_vectors(arrays, "gradient", n_atoms)?;
        let (n_energy, energies) = arrays.floats_with_inner("energy", &[])?;
        if positions.len() != n_energy || gradients.len() != n_energy {
            return Err(SchemaError::Inconsistent {
                name: "energy".to_string(),
                detail: format!(
                    "{n_energy} energies for {} geometries and {} gradients",
                    positions.len(),
                    gradients.len()
                ),
            });
        }
        let conformers = positions
            .into_iter()
            .zip(gradients)
            .zip(energies)
            .map(|((xyz, gradient), &energy)| {
                let energy = energy.ok_or_else(|| SchemaError::MissingValue {
                    name: "energy".to_string(),
                })?;
                Ok(Conformer {
                    positions: xyz.into_iter().map(Point3::from).collect(),
                    energy: Some(energy),
                    gradient: Some(gradient),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let partial_charges = if arrays.contains("partial_charges") {
            let (n, charges) = arrays.floats_with_inner("partial_charges", &[])?;
            if n != n_atoms {
                return Err(SchemaError::Inconsistent {
                    name: "partial_charges".to_string(),
                    detail: format!("{n} charges for {n_atoms} atoms"),
                });
            }
            Some(required(charges, "partial_charges")?)
        } else {
            None
        };

        let parameters = Parameters::from_array_map(&arrays.subset(PARAMETER_ARRAYS))?;
        if parameters.atoms().len() != n_atoms {
            return Err(SchemaError::Inconsistent {
                name: "atoms".to_string(),
                detail: format!(
                    "{} parameter atoms for {n_atoms} atomic numbers",
                    parameters.atoms().len()
                ),
            });
        }

        Ok(Self {
            mol_id: file.mol_id,
            atomic_numbers,
            conformers,
            partial_charges,
            parameters,
        })
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), IoError> {
        self.to_file().write_to_path(path)
    }

    pub fn read_from_path(path: &Path) -> Result<Self, IoError> {
        let file = RecordFile::read_from_path(path)?;
        Self::from_file(file).map_err(|source| IoError::Schema {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn required(data: &[Option<f64>], name: &str) -> Result<Vec<f64>, SchemaError> {
    data.iter()
        .map(|v| {
            v.ok_or_else(|| SchemaError::MissingValue {
                name: name.to_string(),
            })
        })
        .collect()
}

/// Reads a `[n_conf, n_atoms, 3]` array into one vector list per conformer.
fn read_vectors(
    arrays: &ArrayMap,
    name: &str,
    n_atoms: usize,
) -> Result<Vec<Vec<Vector3<f64>>>, SchemaError> {
    let (n_conf, data) = arrays.floats_with_inner(name, &[n_atoms, 3])?;
    let values = required(data, name)?;
    if n_atoms == 0 {
        return Ok(vec![Vec::new(); n_conf]);
    }
    Ok(values
        .chunks_exact(n_atoms * 3)
        .map(|conformer| {
            conformer
                .chunks_exact(3)
                .map(|v| Vector3::new(v[0], v[1], v[2]))
                .collect()
        })
        .collect())
}
