use super::tuples::{
    AngleTuple, BondTuple, InteractionClass, TorsionTuple, canonical_angle, canonical_bond,
    canonical_proper, improper_with_center,
};
use crate::core::models::ids::AtomId;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use thiserror::Error;

/// Default slot of the central atom inside an improper torsion tuple.
pub const DEFAULT_CENTRAL_IDX: usize = 2;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TopologyError {
    #[error("Central atom slot must be within 0..=3, got {0}")]
    InvalidCentralIndex(usize),
    #[error("Atom id {0} appears more than once in the atom list")]
    DuplicateAtom(AtomId),
    #[error("Atom id {atom} referenced by a {class} is not part of the molecule")]
    UnknownAtom {
        atom: AtomId,
        class: InteractionClass,
    },
    #[error("Atom id {0} cannot be bonded to itself")]
    SelfBond(AtomId),
    #[error("The {class} {tuple:?} is listed more than once")]
    DuplicateTuple {
        class: InteractionClass,
        tuple: Vec<AtomId>,
    },
    #[error("Improper torsion {tuple:?} does not have its central atom at slot {central_idx}")]
    MisplacedCenter {
        tuple: TorsionTuple,
        central_idx: usize,
    },
}

/// How a four-atom tuple is connected within a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorsionKind {
    /// Atoms form a bonded chain `a-b-c-d`.
    Proper,
    /// One atom is bonded to the other three; `central_slot` is its position.
    Improper { central_slot: usize },
    /// Neither a chain nor a star.
    Unbonded,
}

/// Canonically ordered interaction tuples of one molecule.
///
/// The topology is computed once from connectivity and is immutable
/// afterwards. Every tuple list is free of duplicates, references only atoms
/// in [`atoms`](Self::atoms), and has a row lookup keyed by the canonical form
/// of each tuple.
#[derive(Debug, Clone)]
pub struct MoleculeTopology {
    atoms: Vec<AtomId>,
    bonds: Vec<BondTuple>,
    angles: Vec<AngleTuple>,
    propers: Vec<TorsionTuple>,
    impropers: Vec<TorsionTuple>,
    central_idx: usize,
    adjacency: BTreeMap<AtomId, BTreeSet<AtomId>>,
    atom_index: HashMap<AtomId, usize>,
    bond_rows: HashMap<BondTuple, usize>,
    angle_rows: HashMap<AngleTuple, usize>,
    proper_rows: HashMap<TorsionTuple, usize>,
    improper_rows: HashMap<TorsionTuple, usize>,
}

impl MoleculeTopology {
    /// Enumerates every bond, angle, proper and improper torsion of a molecule.
    ///
    /// Impropers are generated for each atom with exactly three bonded
    /// neighbours: the three cyclic permutations of its substituents, each
    /// with the center at `central_idx`.
    ///
    /// # Errors
    ///
    /// Returns a [`TopologyError`] when `central_idx` is not a valid slot, an
    /// atom id is duplicated, or a bond references an unknown atom or the
    /// same atom twice.
    pub fn from_connectivity(
        atoms: Vec<AtomId>,
        bonds: &[(AtomId, AtomId)],
        central_idx: usize,
    ) -> Result<Self, TopologyError> {
        if central_idx > 3 {
            return Err(TopologyError::InvalidCentralIndex(central_idx));
        }
        let atom_index = index_atoms(&atoms)?;

        let mut adjacency: BTreeMap<AtomId, BTreeSet<AtomId>> =
            atoms.iter().map(|&a| (a, BTreeSet::new())).collect();
        for &(a, b) in bonds {
            for atom in [a, b] {
                if !atom_index.contains_key(&atom) {
                    return Err(TopologyError::UnknownAtom {
                        atom,
                        class: InteractionClass::Bond,
                    });
                }
            }
            if a == b {
                return Err(TopologyError::SelfBond(a));
            }
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }

        let bond_list: Vec<BondTuple> = bonds
            .iter()
            .map(|&(a, b)| canonical_bond([a, b]))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let angles = enumerate_angles(&adjacency);
        let propers = enumerate_propers(&adjacency, &bond_list);
        let impropers = enumerate_impropers(&adjacency, central_idx);

        Ok(Self::assemble(
            atoms,
            bond_list,
            angles,
            propers,
            impropers,
            central_idx,
            adjacency,
            atom_index,
        ))
    }

    /// Rebuilds a topology from stored tuple lists, e.g. a previously written
    /// record. Tuples are kept exactly as given; call
    /// [`canonicalized`](Self::canonicalized) to enforce canonical order.
    ///
    /// # Errors
    ///
    /// Fails when a tuple references an unknown atom, two tuples of one class
    /// are equal up to their canonical form, or an improper's central slot does
    /// not hold an atom bonded to the other three.
    pub fn from_parts(
        atoms: Vec<AtomId>,
        bonds: Vec<BondTuple>,
        angles: Vec<AngleTuple>,
        propers: Vec<TorsionTuple>,
        impropers: Vec<TorsionTuple>,
        central_idx: usize,
    ) -> Result<Self, TopologyError> {
        if central_idx > 3 {
            return Err(TopologyError::InvalidCentralIndex(central_idx));
        }
        let atom_index = index_atoms(&atoms)?;

        check_members(&atom_index, InteractionClass::Bond, bonds.iter().flatten())?;
        check_members(&atom_index, InteractionClass::Angle, angles.iter().flatten())?;
        check_members(&atom_index, InteractionClass::Proper, propers.iter().flatten())?;
        check_members(&atom_index, InteractionClass::Improper, impropers.iter().flatten())?;

        let mut adjacency: BTreeMap<AtomId, BTreeSet<AtomId>> =
            atoms.iter().map(|&a| (a, BTreeSet::new())).collect();
        for &[a, b] in &bonds {
            if a == b {
                return Err(TopologyError::SelfBond(a));
            }
            adjacency.entry(a).or_default().insert(b);
            adjacency.entry(b).or_default().insert(a);
        }

        for tuple in &impropers {
            let center = tuple[central_idx];
            let neighbors = &adjacency[&center];
            let is_star = tuple
                .iter()
                .enumerate()
                .filter(|&(slot, _)| slot != central_idx)
                .all(|(_, atom)| neighbors.contains(atom));
            if !is_star {
                return Err(TopologyError::MisplacedCenter {
                    tuple: *tuple,
                    central_idx,
                });
            }
        }

        let topology = Self::assemble(
            atoms,
            bonds,
            angles,
            propers,
            impropers,
            central_idx,
            adjacency,
            atom_index,
        );
        topology.check_duplicates()?;
        Ok(topology)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        atoms: Vec<AtomId>,
        bonds: Vec<BondTuple>,
        angles: Vec<AngleTuple>,
        propers: Vec<TorsionTuple>,
        impropers: Vec<TorsionTuple>,
        central_idx: usize,
        adjacency: BTreeMap<AtomId, BTreeSet<AtomId>>,
        atom_index: HashMap<AtomId, usize>,
    ) -> Self {
        let bond_rows = row_lookup(&bonds, |t| canonical_bond(*t));
        let angle_rows = row_lookup(&angles, |t| canonical_angle(*t));
        let proper_rows = row_lookup(&propers, |t| canonical_proper(*t));
        let improper_rows = row_lookup(&impropers, |t| *t);
        Self {
            atoms,
            bonds,
            angles,
            propers,
            impropers,
            central_idx,
            adjacency,
            atom_index,
            bond_rows,
            angle_rows,
            proper_rows,
            improper_rows,
        }
    }

    fn check_duplicates(&self) -> Result<(), TopologyError> {
        fn first_duplicate<T: Copy + Eq + Hash>(
            tuples: &[T],
            canonical: impl Fn(&T) -> T,
        ) -> Option<T> {
            let mut seen = HashSet::with_capacity(tuples.len());
            tuples.iter().map(canonical).find(|key| !seen.insert(*key))
        }

        if let Some(t) = first_duplicate(&self.bonds, |t| canonical_bond(*t)) {
            return Err(duplicate(InteractionClass::Bond, &t));
        }
        if let Some(t) = first_duplicate(&self.angles, |t| canonical_angle(*t)) {
            return Err(duplicate(InteractionClass::Angle, &t));
        }
        if let Some(t) = first_duplicate(&self.propers, |t| canonical_proper(*t)) {
            return Err(duplicate(InteractionClass::Proper, &t));
        }
        if let Some(t) = first_duplicate(&self.impropers, |t| *t) {
            return Err(duplicate(InteractionClass::Improper, &t));
        }
        Ok(())
    }

    /// Returns the topology with every tuple in canonical form and every list
    /// sorted. Applying it to an already canonical topology is a no-op.
    pub fn canonicalized(self) -> Self {
        let mut bonds: Vec<_> = self.bonds.iter().map(|t| canonical_bond(*t)).collect();
        let mut angles: Vec<_> = self.angles.iter().map(|t| canonical_angle(*t)).collect();
        let mut propers: Vec<_> = self.propers.iter().map(|t| canonical_proper(*t)).collect();
        let mut impropers = self.impropers.clone();
        bonds.sort_unstable();
        angles.sort_unstable();
        propers.sort_unstable();
        impropers.sort_unstable();
        Self::assemble(
            self.atoms,
            bonds,
            angles,
            propers,
            impropers,
            self.central_idx,
            self.adjacency,
            self.atom_index,
        )
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[BondTuple] {
        &self.bonds
    }

    pub fn angles(&self) -> &[AngleTuple] {
        &self.angles
    }

    pub fn propers(&self) -> &[TorsionTuple] {
        &self.propers
    }

    pub fn impropers(&self) -> &[TorsionTuple] {
        &self.impropers
    }

    #[inline]
    pub fn central_idx(&self) -> usize {
        self.central_idx
    }

    pub fn contains_atom(&self, atom: AtomId) -> bool {
        self.atom_index.contains_key(&atom)
    }

    pub fn are_bonded(&self, a: AtomId, b: AtomId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    pub fn bond_row(&self, bond: &BondTuple) -> Option<usize> {
        self.bond_rows.get(&canonical_bond(*bond)).copied()
    }

    pub fn angle_row(&self, angle: &AngleTuple) -> Option<usize> {
        self.angle_rows.get(&canonical_angle(*angle)).copied()
    }

    pub fn proper_row(&self, torsion: &TorsionTuple) -> Option<usize> {
        self.proper_rows.get(&canonical_proper(*torsion)).copied()
    }

    /// Impropers are looked up verbatim: slot order carries meaning.
    pub fn improper_row(&self, torsion: &TorsionTuple) -> Option<usize> {
        self.improper_rows.get(torsion).copied()
    }

    /// Classifies a four-atom tuple by its connectivity.
    ///
    /// A bonded chain is reported as proper even when one atom is also bonded
    /// to the other three (small rings).
    pub fn classify_torsion(&self, torsion: &TorsionTuple) -> TorsionKind {
        let distinct: BTreeSet<_> = torsion.iter().collect();
        if distinct.len() != 4 {
            return TorsionKind::Unbonded;
        }
        let [a, b, c, d] = *torsion;
        if self.are_bonded(a, b) && self.are_bonded(b, c) && self.are_bonded(c, d) {
            return TorsionKind::Proper;
        }
        (0..4)
            .find(|&slot| {
                (0..4)
                    .filter(|&other| other != slot)
                    .all(|other| self.are_bonded(torsion[slot], torsion[other]))
            })
            .map_or(TorsionKind::Unbonded, |central_slot| {
                TorsionKind::Improper { central_slot }
            })
    }
}

fn index_atoms(atoms: &[AtomId]) -> Result<HashMap<AtomId, usize>, TopologyError> {
    let mut index = HashMap::with_capacity(atoms.len());
    for (i, &atom) in atoms.iter().enumerate() {
        if index.insert(atom, i).is_some() {
            return Err(TopologyError::DuplicateAtom(atom));
        }
    }
    Ok(index)
}

fn check_members<'a>(
    atom_index: &HashMap<AtomId, usize>,
    class: InteractionClass,
    members: impl Iterator<Item = &'a AtomId>,
) -> Result<(), TopologyError> {
    for &atom in members {
        if !atom_index.contains_key(&atom) {
            return Err(TopologyError::UnknownAtom { atom, class });
        }
    }
    Ok(())
}

fn duplicate<const N: usize>(class: InteractionClass, tuple: &[AtomId; N]) -> TopologyError {
    TopologyError::DuplicateTuple {
        class,
        tuple: tuple.to_vec(),
    }
}

fn row_lookup<T, K>(tuples: &[T], canonical: impl Fn(&T) -> K) -> HashMap<K, usize>
where
    K: Eq + Hash,
{
    tuples
        .iter()
        .enumerate()
        .map(|(row, t)| (canonical(t), row))
        .collect()
}

fn enumerate_angles(adjacency: &BTreeMap<AtomId, BTreeSet<AtomId>>) -> Vec<AngleTuple> {
    let mut angles: Vec<AngleTuple> = adjacency
        .iter()
        .flat_map(|(&apex, neighbors)| {
            neighbors
                .iter()
                .tuple_combinations()
                .map(move |(&a, &c)| canonical_angle([a, apex, c]))
        })
        .collect();
    angles.sort_unstable();
    angles
}

fn enumerate_propers(
    adjacency: &BTreeMap<AtomId, BTreeSet<AtomId>>,
    bonds: &[BondTuple],
) -> Vec<TorsionTuple> {
    let mut propers = BTreeSet::new();
    for &[b, c] in bonds {
        for &a in adjacency[&b].iter().filter(|&&a| a != c) {
            for &d in adjacency[&c].iter().filter(|&&d| d != b && d != a) {
                propers.insert(canonical_proper([a, b, c, d]));
            }
        }
    }
    propers.into_iter().collect()
}

fn enumerate_impropers(
    adjacency: &BTreeMap<AtomId, BTreeSet<AtomId>>,
    central_idx: usize,
) -> Vec<TorsionTuple> {
    let mut impropers = Vec::new();
    for (&center, neighbors) in adjacency {
        if neighbors.len() != 3 {
            continue;
        }
        let s: Vec<AtomId> = neighbors.iter().copied().collect();
        for substituents in [[s[0], s[1], s[2]], [s[1], s[2], s[0]], [s[2], s[0], s[1]]] {
            impropers.push(improper_with_center(center, substituents, central_idx));
        }
    }
    impropers.sort_unstable();
    impropers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::atom_ids;

    fn id(n: u32) -> AtomId {
        AtomId(n)
    }

    fn bonds(pairs: &[(u32, u32)]) -> Vec<(AtomId, AtomId)> {
        pairs.iter().map(|&(a, b)| (id(a), id(b))).collect()
    }

    // Formaldehyde-like star: C10 bonded to O20, H30, H40.
    fn formaldehyde() -> MoleculeTopology {
        MoleculeTopology::from_connectivity(
            atom_ids(&[10, 20, 30, 40]),
            &bonds(&[(20, 10), (10, 30), (40, 10)]),
            DEFAULT_CENTRAL_IDX,
        )
        .unwrap()
    }

    // n-butane carbon chain with non-contiguous ids: 7-3-5-1.
    fn butane_chain() -> MoleculeTopology {
        MoleculeTopology::from_connectivity(
            atom_ids(&[7, 3, 5, 1]),
            &bonds(&[(7, 3), (3, 5), (5, 1)]),
            DEFAULT_CENTRAL_IDX,
        )
        .unwrap()
    }

    #[test]
    fn bonds_are_ascending_and_unique() {
        let topology = formaldehyde();
        assert_eq!(
            topology.bonds(),
            &[[id(10), id(20)], [id(10), id(30)], [id(10), id(40)]]
        );
    }

    #[test]
    fn angles_have_smaller_first_endpoint() {
        let topology = formaldehyde();
        assert_eq!(
            topology.angles(),
            &[
                [id(20), id(10), id(30)],
                [id(20), id(10), id(40)],
                [id(30), id(10), id(40)],
            ]
        );
    }

    #[test]
    fn propers_are_enumerated_once_with_ordered_endpoints() {
        let topology = butane_chain();
        assert_eq!(topology.propers(), &[[id(1), id(5), id(3), id(7)]]);
        assert!(topology.impropers().is_empty());
    }

    #[test]
    fn impropers_hold_cyclic_permutations_with_center_at_slot() {
        let topology = formaldehyde();
        assert_eq!(
            topology.impropers(),
            &[
                [id(20), id(30), id(10), id(40)],
                [id(30), id(40), id(10), id(20)],
                [id(40), id(20), id(10), id(30)],
            ]
        );
        assert!(topology.impropers().iter().all(|t| t[2] == id(10)));
    }

    #[test]
    fn impropers_follow_configured_central_slot() {
        let topology = MoleculeTopology::from_connectivity(
            atom_ids(&[10, 20, 30, 40]),
            &bonds(&[(10, 20), (10, 30), (10, 40)]),
            0,
        )
        .unwrap();
        assert!(topology.impropers().iter().all(|t| t[0] == id(10)));
        assert_eq!(topology.impropers().len(), 3);
    }

    #[test]
    fn three_membered_ring_has_no_propers() {
        let topology = MoleculeTopology::from_connectivity(
            atom_ids(&[0, 1, 2]),
            &bonds(&[(0, 1), (1, 2), (2, 0)]),
            DEFAULT_CENTRAL_IDX,
        )
        .unwrap();
        assert!(topology.propers().is_empty());
        assert_eq!(topology.angles().len(), 3);
    }

    #[test]
    fn every_tuple_member_is_a_known_atom() {
        let topology = formaldehyde();
        let all = topology
            .bonds()
            .iter()
            .flatten()
            .chain(topology.angles().iter().flatten())
            .chain(topology.propers().iter().flatten())
            .chain(topology.impropers().iter().flatten());
        for atom in all {
            assert!(topology.contains_atom(*atom));
        }
    }

    #[test]
    fn rejects_invalid_connectivity() {
        let atoms = atom_ids(&[1, 2]);
        assert_eq!(
            MoleculeTopology::from_connectivity(atoms.clone(), &bonds(&[(1, 3)]), 2).unwrap_err(),
            TopologyError::UnknownAtom {
                atom: id(3),
                class: InteractionClass::Bond
            }
        );
        assert_eq!(
            MoleculeTopology::from_connectivity(atoms.clone(), &bonds(&[(1, 1)]), 2).unwrap_err(),
            TopologyError::SelfBond(id(1))
        );
        assert_eq!(
            MoleculeTopology::from_connectivity(atoms, &[], 4).unwrap_err(),
            TopologyError::InvalidCentralIndex(4)
        );
        assert_eq!(
            MoleculeTopology::from_connectivity(atom_ids(&[1, 1]), &[], 2).unwrap_err(),
            TopologyError::DuplicateAtom(id(1))
        );
    }

    #[test]
    fn canonicalized_is_idempotent() {
        let topology = formaldehyde();
        let once = topology.clone().canonicalized();
        let twice = once.clone().canonicalized();
        assert_eq!(once.bonds(), topology.bonds());
        assert_eq!(once.angles(), topology.angles());
        assert_eq!(once.impropers(), topology.impropers());
        assert_eq!(twice.bonds(), once.bonds());
        assert_eq!(twice.propers(), once.propers());
    }

    #[test]
    fn from_parts_then_canonicalized_orders_tuples() {
        let topology = MoleculeTopology::from_parts(
            atom_ids(&[7, 3, 5, 1]),
            vec![[id(3), id(7)], [id(5), id(3)], [id(1), id(5)]],
            vec![[id(7), id(3), id(5)], [id(1), id(5), id(3)]],
            vec![[id(7), id(3), id(5), id(1)]],
            vec![],
            DEFAULT_CENTRAL_IDX,
        )
        .unwrap()
        .canonicalized();
        assert_eq!(
            topology.bonds(),
            &[[id(1), id(5)], [id(3), id(5)], [id(3), id(7)]]
        );
        assert_eq!(
            topology.angles(),
            &[[id(1), id(5), id(3)], [id(5), id(3), id(7)]]
        );
        assert_eq!(topology.propers(), butane_chain().propers());
    }

    #[test]
    fn from_parts_rejects_duplicates_up_to_canonical_form() {
        let result = MoleculeTopology::from_parts(
            atom_ids(&[1, 2]),
            vec![[id(1), id(2)], [id(2), id(1)]],
            vec![],
            vec![],
            vec![],
            DEFAULT_CENTRAL_IDX,
        );
        assert!(matches!(
            result,
            Err(TopologyError::DuplicateTuple {
                class: InteractionClass::Bond,
                ..
            })
        ));
    }

    #[test]
    fn from_parts_rejects_misplaced_improper_center() {
        let result = MoleculeTopology::from_parts(
            atom_ids(&[10, 20, 30, 40]),
            vec![[id(10), id(20)], [id(10), id(30)], [id(10), id(40)]],
            vec![],
            vec![],
            vec![[id(10), id(20), id(30), id(40)]],
            DEFAULT_CENTRAL_IDX,
        );
        assert!(matches!(result, Err(TopologyError::MisplacedCenter { .. })));
    }

    #[test]
    fn row_lookups_accept_any_orientation() {
        let topology = butane_chain();
        assert_eq!(topology.bond_row(&[id(3), id(7)]), Some(2));
        assert_eq!(topology.bond_row(&[id(7), id(3)]), Some(2));
        assert_eq!(topology.proper_row(&[id(7), id(3), id(5), id(1)]), Some(0));
        assert_eq!(topology.angle_row(&[id(7), id(3), id(1)]), None);
    }

    #[test]
    fn classify_torsion_distinguishes_chain_star_and_unbonded() {
        let chain = butane_chain();
        assert_eq!(
            chain.classify_torsion(&[id(7), id(3), id(5), id(1)]),
            TorsionKind::Proper
        );
        assert_eq!(
            chain.classify_torsion(&[id(7), id(5), id(3), id(1)]),
            TorsionKind::Unbonded
        );

        let star = formaldehyde();
        assert_eq!(
            star.classify_torsion(&[id(10), id(20), id(30), id(40)]),
            TorsionKind::Improper { central_slot: 0 }
        );
        assert_eq!(
            star.classify_torsion(&[id(20), id(30), id(10), id(40)]),
            TorsionKind::Improper { central_slot: 2 }
        );
        assert_eq!(
            star.classify_torsion(&[id(20), id(20), id(10), id(40)]),
            TorsionKind::Unbonded
        );
    }
}
