use super::config::{CanonicalizationConfig, DEFAULT_N_PERIODICITY_IMPROPER};
use super::error::CanonicalizationError;
use super::phase::SignedCoefficient;
use crate::core::io::arrays::{ArrayMap, NamedArray, SchemaError, tuple_array};
use crate::core::models::ids::AtomId;
use crate::core::topology::molecule::{DEFAULT_CENTRAL_IDX, MoleculeTopology};
use crate::core::topology::tuples::{AngleTuple, BondTuple, InteractionClass, TorsionTuple};
use tracing::warn;

/// Array names produced by [`Parameters::to_array_map`].
pub const PARAMETER_ARRAYS: &[&str] = &[
    "atoms",
    "bonds",
    "bond_k",
    "bond_eq",
    "angles",
    "angle_k",
    "angle_eq",
    "propers",
    "proper_ks",
    "proper_phases",
    "impropers",
    "improper_ks",
    "improper_phases",
];

/// Fourier coefficients and phases of one torsion class.
///
/// Row-major `rows x n_periodicity`; column `j` holds periodicity `j + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierTable {
    rows: usize,
    n_periodicity: usize,
    ks: Vec<Option<f64>>,
    phases: Vec<Option<f64>>,
}

impl FourierTable {
    /// A table with every coefficient and phase set to zero.
    pub fn zeroed(rows: usize, n_periodicity: usize) -> Self {
        Self::filled(rows, n_periodicity, Some(0.0))
    }

    pub fn missing(rows: usize, n_periodicity: usize) -> Self {
        Self::filled(rows, n_periodicity, None)
    }

    fn filled(rows: usize, n_periodicity: usize, value: Option<f64>) -> Self {
        Self {
            rows,
            n_periodicity,
            ks: vec![value; rows * n_periodicity],
            phases: vec![value; rows * n_periodicity],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn n_periodicity(&self) -> usize {
        self.n_periodicity
    }

    pub fn ks(&self) -> &[Option<f64>] {
        &self.ks
    }

    pub fn phases(&self) -> &[Option<f64>] {
        &self.phases
    }

    pub fn k(&self, row: usize, column: usize) -> Option<f64> {
        self.ks[row * self.n_periodicity + column]
    }

    pub fn phase(&self, row: usize, column: usize) -> Option<f64> {
        self.phases[row * self.n_periodicity + column]
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, k: f64, phase: f64) {
        let cell = row * self.n_periodicity + column;
        self.ks[cell] = Some(k);
        self.phases[cell] = Some(phase);
    }

    /// Re-expresses every term as a signed coefficient with zero phase.
    ///
    /// # Errors
    ///
    /// With [`SignedExportPolicy::Strict`], the first phase that is not a
    /// multiple of π is reported as
    /// [`CanonicalizationError::UnrepresentablePhase`]. With
    /// [`SignedExportPolicy::AllowMissing`] the whole table becomes missing
    /// instead.
    pub fn signed(
        &self,
        class: InteractionClass,
        tolerance: f64,
        policy: SignedExportPolicy,
    ) -> Result<SignedTable, CanonicalizationError> {
        let mut values = Vec::with_capacity(self.ks.len());
        for (cell, (&k, &phase)) in self.ks.iter().zip(&self.phases).enumerate() {
            match SignedCoefficient::from_term(k, phase, tolerance) {
                SignedCoefficient::Value(v) => values.push(Some(v)),
                SignedCoefficient::Missing => values.push(None),
                SignedCoefficient::Unrepresentable => {
                    let row = cell / self.n_periodicity;
                    let phase = phase.unwrap_or_default();
                    return match policy {
                        SignedExportPolicy::Strict => {
                            Err(CanonicalizationError::UnrepresentablePhase { class, row, phase })
                        }
                        SignedExportPolicy::AllowMissing => {
                            warn!(
                                "Phase {phase:.4} of {class} row {row} is not a multiple of pi; exporting the table as missing"
                            );
                            Ok(SignedTable {
                                rows: self.rows,
                                n_periodicity: self.n_periodicity,
                                values: vec![None; self.ks.len()],
                            })
                        }
                    };
                }
            }
        }
        Ok(SignedTable {
            rows: self.rows,
            n_periodicity: self.n_periodicity,
            values,
        })
    }
}

/// What to do when a phase cannot be folded into the coefficient's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignedExportPolicy {
    #[default]
    Strict,
    AllowMissing,
}

/// Signed torsion coefficients, row-major `rows x n_periodicity`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTable {
    rows: usize,
    n_periodicity: usize,
    values: Vec<Option<f64>>,
}

impl SignedTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn n_periodicity(&self) -> usize {
        self.n_periodicity
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn row(&self, row: usize) -> &[Option<f64>] {
        let start = row * self.n_periodicity;
        &self.values[start..start + self.n_periodicity]
    }

    /// Pads every row with zeros or truncates it to `n_periodicity` columns.
    ///
    /// Rows that are entirely missing are padded with missing cells. Dropping
    /// a non-zero coefficient is logged.
    pub fn resized(&self, n_periodicity: usize) -> Self {
        if n_periodicity == self.n_periodicity {
            return self.clone();
        }
        if n_periodicity < self.n_periodicity {
            let dropped = (0..self.rows).any(|r| {
                self.row(r)[n_periodicity..]
                    .iter()
                    .any(|v| v.is_some_and(|v| v != 0.0))
            });
            if dropped {
                warn!(
                    "Truncating torsion coefficients from {} to {} periodicities drops non-zero terms",
                    self.n_periodicity, n_periodicity
                );
            }
        }
        let mut values = Vec::with_capacity(self.rows * n_periodicity);
        for r in 0..self.rows {
            let row = self.row(r);
            let fill = if row.iter().all(Option::is_none) {
                None
            } else {
                Some(0.0)
            };
            values.extend((0..n_periodicity).map(|c| row.get(c).copied().unwrap_or(fill)));
        }
        Self {
            rows: self.rows,
            n_periodicity,
            values,
        }
    }
}

/// Canonical per-molecule parameters, row-aligned with a topology's tuples.
///
/// Bond and angle terms hold one force constant and one equilibrium value
/// per tuple; torsions hold a [`FourierTable`]. Stored Fourier coefficients
/// are non-negative. The value is built once and never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    atoms: Vec<AtomId>,
    bonds: Vec<BondTuple>,
    bond_k: Vec<Option<f64>>,
    bond_eq: Vec<Option<f64>>,
    angles: Vec<AngleTuple>,
    angle_k: Vec<Option<f64>>,
    angle_eq: Vec<Option<f64>>,
    propers: Vec<TorsionTuple>,
    proper: FourierTable,
    impropers: Vec<TorsionTuple>,
    improper: FourierTable,
}

/// Per-term values gathered by the canonicalizer.
pub(crate) struct ParameterColumns {
    pub bond_k: Vec<Option<f64>>,
    pub bond_eq: Vec<Option<f64>>,
    pub angle_k: Vec<Option<f64>>,
    pub angle_eq: Vec<Option<f64>>,
    pub proper: FourierTable,
    pub improper: FourierTable,
}

impl Parameters {
    pub(crate) fn from_columns(topology: &MoleculeTopology, columns: ParameterColumns) -> Self {
        Self {
            atoms: topology.atoms().to_vec(),
            bonds: topology.bonds().to_vec(),
            bond_k: columns.bond_k,
            bond_eq: columns.bond_eq,
            angles: topology.angles().to_vec(),
            angle_k: columns.angle_k,
            angle_eq: columns.angle_eq,
            propers: topology.propers().to_vec(),
            proper: columns.proper,
            impropers: topology.impropers().to_vec(),
            improper: columns.improper,
        }
    }

    /// All-missing parameters with the shape implied by `topology`.
    pub fn placeholder(topology: &MoleculeTopology, config: &CanonicalizationConfig) -> Self {
        let n_bonds = topology.bonds().len();
        let n_angles = topology.angles().len();
        Self::from_columns(
            topology,
            ParameterColumns {
                bond_k: vec![None; n_bonds],
                bond_eq: vec![None; n_bonds],
                angle_k: vec![None; n_angles],
                angle_eq: vec![None; n_angles],
                proper: FourierTable::missing(
                    topology.propers().len(),
                    config.n_periodicity_proper,
                ),
                improper: FourierTable::missing(
                    topology.impropers().len(),
                    config.n_periodicity_improper,
                ),
            },
        )
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[BondTuple] {
        &self.bonds
    }

    pub fn bond_k(&self) -> &[Option<f64>] {
        &self.bond_k
    }

    pub fn bond_eq(&self) -> &[Option<f64>] {
        &self.bond_eq
    }

    pub fn angles(&self) -> &[AngleTuple] {
        &self.angles
    }

    pub fn angle_k(&self) -> &[Option<f64>] {
        &self.angle_k
    }

    pub fn angle_eq(&self) -> &[Option<f64>] {
        &self.angle_eq
    }

    pub fn propers(&self) -> &[TorsionTuple] {
        &self.propers
    }

    pub fn proper_table(&self) -> &FourierTable {
        &self.proper
    }

    pub fn impropers(&self) -> &[TorsionTuple] {
        &self.impropers
    }

    pub fn improper_table(&self) -> &FourierTable {
        &self.improper
    }

    /// Whether any value cell is missing.
    pub fn has_missing(&self) -> bool {
        [
            &self.bond_k,
            &self.bond_eq,
            &self.angle_k,
            &self.angle_eq,
            &self.proper.ks,
            &self.proper.phases,
            &self.improper.ks,
            &self.improper.phases,
        ]
        .iter()
        .any(|column| column.iter().any(Option::is_none))
    }

    /// Signed proper coefficients, optionally resized to `n_columns`.
    pub fn signed_proper_ks(
        &self,
        tolerance: f64,
        policy: SignedExportPolicy,
        n_columns: Option<usize>,
    ) -> Result<SignedTable, CanonicalizationError> {
        let table = self.proper.signed(InteractionClass::Proper, tolerance, policy)?;
        Ok(match n_columns {
            Some(n) => table.resized(n),
            None => table,
        })
    }

    /// Signed improper coefficients, optionally resized to `n_columns`.
    pub fn signed_improper_ks(
        &self,
        tolerance: f64,
        policy: SignedExportPolicy,
        n_columns: Option<usize>,
    ) -> Result<SignedTable, CanonicalizationError> {
        let table = self
            .improper
            .signed(InteractionClass::Improper, tolerance, policy)?;
        Ok(match n_columns {
            Some(n) => table.resized(n),
            None => table,
        })
    }

    /// Flattens the parameters into named dense arrays.
    pub fn to_array_map(&self) -> ArrayMap {
        let id = |a: &AtomId| a.value();
        let mut map = ArrayMap::new();
        map.insert(
            "atoms",
            NamedArray::ints(vec![self.atoms.len()], self.atoms.iter().map(id).collect()),
        );
        map.insert("bonds", tuple_array(&self.bonds, id));
        map.insert("bond_k", column(&self.bond_k));
        map.insert("bond_eq", column(&self.bond_eq));
        map.insert("angles", tuple_array(&self.angles, id));
        map.insert("angle_k", column(&self.angle_k));
        map.insert("angle_eq", column(&self.angle_eq));
        map.insert("propers", tuple_array(&self.propers, id));
        map.insert("proper_ks", table_array(&self.proper, &self.proper.ks));
        map.insert("proper_phases", table_array(&self.proper, &self.proper.phases));
        map.insert("impropers", tuple_array(&self.impropers, id));
        map.insert("improper_ks", table_array(&self.improper, &self.improper.ks));
        map.insert(
            "improper_phases",
            table_array(&self.improper, &self.improper.phases),
        );
        map
    }

    /// Rebuilds parameters from named arrays.
    ///
    /// The improper arrays are optional; every other parameter array is
    /// required. Tuples must reference listed atoms and be free of
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown or missing arrays, wrong dtypes,
    /// shapes that disagree with each other, or an invalid tuple set.
    pub fn from_array_map(map: &ArrayMap) -> Result<Self, SchemaError> {
        map.validate(PARAMETER_ARRAYS)?;

        let (_, atom_data) = map.ints_with_inner("atoms", &[])?;
        let atoms: Vec<AtomId> = atom_data.iter().copied().map(AtomId).collect();

        let bonds: Vec<BondTuple> = read_tuples(map, "bonds")?;
        let bond_k = read_column(map, "bond_k", bonds.len())?;
        let bond_eq = read_column(map, "bond_eq", bonds.len())?;

        let angles: Vec<AngleTuple> = read_tuples(map, "angles")?;
        let angle_k = read_column(map, "angle_k", angles.len())?;
        let angle_eq = read_column(map, "angle_eq", angles.len())?;

        let propers: Vec<TorsionTuple> = read_tuples(map, "propers")?;
        let proper = read_table(map, "proper_ks", "proper_phases", propers.len())?;

        let (impropers, improper) = if map.contains("impropers") {
            let impropers: Vec<TorsionTuple> = read_tuples(map, "impropers")?;
            let table = read_table(map, "improper_ks", "improper_phases", impropers.len())?;
            (impropers, table)
        } else {
            (
                Vec::new(),
                FourierTable::zeroed(0, DEFAULT_N_PERIODICITY_IMPROPER),
            )
        };

        let central_idx = impropers
            .first()
            .and_then(|t| central_slot_of(t, &bonds))
            .unwrap_or(DEFAULT_CENTRAL_IDX);
        MoleculeTopology::from_parts(
            atoms.clone(),
            bonds.clone(),
            angles.clone(),
            propers.clone(),
            impropers.clone(),
            central_idx,
        )
        .map_err(|e| SchemaError::Inconsistent {
            name: "topology".to_string(),
            detail: e.to_string(),
        })?;

        Ok(Self {
            atoms,
            bonds,
            bond_k,
            bond_eq,
            angles,
            angle_k,
            angle_eq,
            propers,
            proper,
            impropers,
            improper,
        })
    }
}

fn column(values: &[Option<f64>]) -> NamedArray {
    NamedArray::floats(vec![values.len()], values.to_vec())
}

fn table_array(table: &FourierTable, values: &[Option<f64>]) -> NamedArray {
    NamedArray::floats(vec![table.rows, table.n_periodicity], values.to_vec())
}

fn read_tuples<const N: usize>(
    map: &ArrayMap,
    name: &str,
) -> Result<Vec<[AtomId; N]>, SchemaError> {
    let (_, data) = map.ints_with_inner(name, &[N])?;
    Ok(data
        .chunks_exact(N)
        .map(|chunk| {
            let mut tuple = [AtomId::default(); N];
            for (slot, &value) in tuple.iter_mut().zip(chunk) {
                *slot = AtomId(value);
            }
            tuple
        })
        .collect())
}

fn read_column(map: &ArrayMap, name: &str, rows: usize) -> Result<Vec<Option<f64>>, SchemaError> {
    let (n, data) = map.floats_with_inner(name, &[])?;
    if n != rows {
        return Err(SchemaError::Inconsistent {
            name: name.to_string(),
            detail: format!("{n} values for {rows} tuples"),
        });
    }
    Ok(data.to_vec())
}

fn read_table(
    map: &ArrayMap,
    ks_name: &str,
    phases_name: &str,
    rows: usize,
) -> Result<FourierTable, SchemaError> {
    let (ks_shape, ks) = map.floats(ks_name)?;
    let (phases_shape, phases) = map.floats(phases_name)?;
    let n_periodicity = match *ks_shape {
        [n, width] if n == rows && width > 0 => width,
        _ => {
            return Err(SchemaError::ShapeMismatch {
                name: ks_name.to_string(),
                expected: format!("[{rows}, p] with p >= 1"),
                found: ks_shape.to_vec(),
            });
        }
    };
    if phases_shape != ks_shape {
        return Err(SchemaError::ShapeMismatch {
            name: phases_name.to_string(),
            expected: format!("{ks_shape:?}"),
            found: phases_shape.to_vec(),
        });
    }
    Ok(FourierTable {
        rows,
        n_periodicity,
        ks: ks.to_vec(),
        phases: phases.to_vec(),
    })
}

/// Slot of the atom bonded to the three others, judged from the bond list.
fn central_slot_of(tuple: &TorsionTuple, bonds: &[BondTuple]) -> Option<usize> {
    let bonded = |a: AtomId, b: AtomId| {
        bonds
            .iter()
            .any(|&[x, y]| (x, y) == (a, b) || (x, y) == (b, a))
    };
    (0..4).find(|&slot| {
        (0..4)
            .filter(|&other| other != slot)
            .all(|other| bonded(tuple[slot], tuple[other]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::atom_ids;
    use std::f64::consts::PI;

    fn formaldehyde() -> MoleculeTopology {
        MoleculeTopology::from_connectivity(
            atom_ids(&[0, 1, 2, 3]),
            &[
                (AtomId(0), AtomId(1)),
                (AtomId(0), AtomId(2)),
                (AtomId(0), AtomId(3)),
            ],
            2,
        )
        .unwrap()
    }

    fn filled(topology: &MoleculeTopology) -> Parameters {
        let mut proper = FourierTable::zeroed(topology.propers().len(), 6);
        let mut improper = FourierTable::zeroed(topology.impropers().len(), 3);
        for row in 0..improper.rows() {
            improper.set(row, 1, 1.1, PI);
        }
        if proper.rows() > 0 {
            proper.set(0, 2, 0.2, 0.0);
        }
        Parameters::from_columns(
            topology,
            ParameterColumns {
                bond_k: vec![Some(500.0), Some(340.0), None],
                bond_eq: vec![Some(1.2), Some(1.09), Some(1.09)],
                angle_k: vec![Some(50.0); 3],
                angle_eq: vec![Some(2.1), Some(2.1), Some(2.0)],
                proper,
                improper,
            },
        )
    }

    #[test]
    fn placeholder_has_topology_shape_and_only_missing_values() {
        let topology = formaldehyde();
        let params = Parameters::placeholder(&topology, &CanonicalizationConfig::default());
        assert_eq!(params.bonds(), topology.bonds());
        assert_eq!(params.bond_k().len(), 3);
        assert_eq!(params.improper_table().rows(), 3);
        assert_eq!(params.improper_table().n_periodicity(), 3);
        assert_eq!(params.proper_table().rows(), 0);
        assert!(params.bond_k().iter().all(Option::is_none));
        assert!(params.improper_table().ks().iter().all(Option::is_none));
        assert!(params.has_missing());
    }

    #[test]
    fn array_map_round_trip_is_identical() {
        let params = filled(&formaldehyde());
        let map = params.to_array_map();
        assert_eq!(map.get("improper_ks").unwrap().shape(), &[3, 3]);
        assert_eq!(map.get("proper_ks").unwrap().shape(), &[0, 6]);
        let back = Parameters::from_array_map(&map).unwrap();
        assert_eq!(back, params);

        let json = serde_json::to_string(&map).unwrap();
        let reparsed: ArrayMap = serde_json::from_str(&json).unwrap();
        assert_eq!(Parameters::from_array_map(&reparsed).unwrap(), params);
    }

    #[test]
    fn from_array_map_rejects_unknown_and_inconsistent_arrays() {
        let params = filled(&formaldehyde());

        let mut map = params.to_array_map();
        map.insert("bond_order", NamedArray::ints(vec![0], vec![]));
        assert_eq!(
            Parameters::from_array_map(&map),
            Err(SchemaError::UnknownArray("bond_order".to_string()))
        );

        let mut map = params.to_array_map();
        map.insert("bond_k", NamedArray::dense(vec![2], [1.0, 2.0]));
        assert!(matches!(
            Parameters::from_array_map(&map),
            Err(SchemaError::Inconsistent { .. })
        ));

        let mut map = params.to_array_map();
        map.insert("bonds", NamedArray::ints(vec![3, 2], vec![0, 1, 0, 2, 0, 9]));
        assert!(matches!(
            Parameters::from_array_map(&map),
            Err(SchemaError::Inconsistent { .. })
        ));
    }

    #[test]
    fn impropers_are_optional_on_read() {
        let topology = MoleculeTopology::from_connectivity(
            atom_ids(&[0, 1]),
            &[(AtomId(0), AtomId(1))],
            2,
        )
        .unwrap();
        let params = Parameters::placeholder(&topology, &CanonicalizationConfig::default());
        let full = params.to_array_map();
        let without = full.subset(&PARAMETER_ARRAYS[..10]);
        assert!(!without.contains("impropers"));
        assert_eq!(Parameters::from_array_map(&without).unwrap(), params);
    }

    #[test]
    fn signed_export_folds_phase_into_sign() {
        let params = filled(&formaldehyde());
        let signed = params
            .signed_improper_ks(1e-2, SignedExportPolicy::Strict, None)
            .unwrap();
        assert_eq!(signed.row(0), &[Some(0.0), Some(-1.1), Some(0.0)]);
    }

    #[test]
    fn unrepresentable_phase_fails_or_degrades_whole_table() {
        let mut table = FourierTable::zeroed(2, 2);
        table.set(0, 0, 1.0, 0.0);
        table.set(1, 1, 1.0, PI / 3.0);

        let err = table
            .signed(InteractionClass::Proper, 1e-2, SignedExportPolicy::Strict)
            .unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::UnrepresentablePhase { row: 1, .. }
        ));

        let degraded = table
            .signed(InteractionClass::Proper, 1e-2, SignedExportPolicy::AllowMissing)
            .unwrap();
        assert_eq!(degraded.values(), &[None, None, None, None]);
    }

    #[test]
    fn resize_pads_with_zeros_and_truncates() {
        let mut table = FourierTable::zeroed(1, 3);
        table.set(0, 0, 2.0, PI);
        table.set(0, 2, 0.5, 0.0);
        let signed = table
            .signed(InteractionClass::Proper, 1e-2, SignedExportPolicy::Strict)
            .unwrap();

        let padded = signed.resized(5);
        assert_eq!(
            padded.row(0),
            &[Some(-2.0), Some(0.0), Some(0.5), Some(0.0), Some(0.0)]
        );

        let truncated = signed.resized(1);
        assert_eq!(truncated.row(0), &[Some(-2.0)]);

        let missing = FourierTable::missing(1, 2)
            .signed(InteractionClass::Proper, 1e-2, SignedExportPolicy::Strict)
            .unwrap()
            .resized(3);
        assert_eq!(missing.row(0), &[None, None, None]);
    }
}
