use super::config::CanonicalizationConfig;
use super::error::CanonicalizationError;
use super::improper::{ImproperResolution, ImproperSymmetryResolver};
use super::parameters::{FourierTable, ParameterColumns, Parameters};
use super::phase::{normalize_sign, phases_agree, reduce};
use super::raw::{Addressing, RawParameterSet, RawTorsion};
use crate::core::models::ids::AtomId;
use crate::core::topology::molecule::{MoleculeTopology, TorsionKind};
use crate::core::topology::tuples::{InteractionClass, TorsionTuple, canonical_proper};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Counts of raw torsion terms that did not make it into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizationReport {
    pub zero_terms: usize,
    pub skipped_impropers: usize,
}

/// Maps raw, arbitrarily ordered parameters onto a topology's canonical rows.
pub struct ParameterCanonicalizer<'a> {
    topology: &'a MoleculeTopology,
    config: CanonicalizationConfig,
}

impl<'a> ParameterCanonicalizer<'a> {
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::InvalidConfig`] when the configuration
    /// is out of range or its central slot differs from the one the topology
    /// was built with.
    pub fn new(
        topology: &'a MoleculeTopology,
        config: &CanonicalizationConfig,
    ) -> Result<Self, CanonicalizationError> {
        config.validate()?;
        if config.central_idx != topology.central_idx() {
            return Err(CanonicalizationError::InvalidConfig {
                name: "central-idx",
                reason: format!(
                    "topology places improper centers at slot {}, configuration expects {}",
                    topology.central_idx(),
                    config.central_idx
                ),
            });
        }
        Ok(Self {
            topology,
            config: *config,
        })
    }

    pub fn config(&self) -> &CanonicalizationConfig {
        &self.config
    }

    pub fn canonicalize(&self, raw: &RawParameterSet) -> Result<Parameters, CanonicalizationError> {
        self.canonicalize_with_report(raw).map(|(params, _)| params)
    }

    /// Canonicalizes `raw` and reports the torsion terms that were dropped.
    ///
    /// # Errors
    ///
    /// Any [`CanonicalizationError`] is fatal for the molecule; improper
    /// match failures are only reported when `allow_skip_improper` is off.
    pub fn canonicalize_with_report(
        &self,
        raw: &RawParameterSet,
    ) -> Result<(Parameters, CanonicalizationReport), CanonicalizationError> {
        let (bond_k, bond_eq) = self.bonded_terms(
            InteractionClass::Bond,
            self.topology.bonds(),
            raw.bonds.iter().map(|b| (&b.atoms[..], b.k, b.eq)),
            raw.addressing,
            raw.bonds.len(),
        )?;
        let (angle_k, angle_eq) = self.bonded_terms(
            InteractionClass::Angle,
            self.topology.angles(),
            raw.angles.iter().map(|a| (&a.atoms[..], a.k, a.eq)),
            raw.addressing,
            raw.angles.len(),
        )?;

        let mut torsions = TorsionAccumulator::new(self.topology, &self.config);
        let mut report = CanonicalizationReport::default();
        for term in &raw.torsions {
            if term.k == 0.0 {
                report.zero_terms += 1;
                continue;
            }
            let tuple = self.resolve_tuple(InteractionClass::Proper, &term.atoms, raw.addressing)?;
            match self.topology.classify_torsion(&tuple) {
                TorsionKind::Proper => torsions.add_proper(tuple, term)?,
                TorsionKind::Improper { .. } => {
                    if !torsions.add_improper(tuple, term)? {
                        report.skipped_impropers += 1;
                    }
                }
                TorsionKind::Unbonded => {
                    return Err(CanonicalizationError::MatchFailure {
                        class: InteractionClass::Proper,
                        tuple: ids(&tuple),
                    });
                }
            }
        }
        if report.skipped_impropers > 0 {
            warn!(
                "Skipped {} improper torsion terms without a canonical counterpart",
                report.skipped_impropers
            );
        }

        let params = Parameters::from_columns(
            self.topology,
            ParameterColumns {
                bond_k,
                bond_eq,
                angle_k,
                angle_eq,
                proper: torsions.proper,
                improper: torsions.improper,
            },
        );
        Ok((params, report))
    }

    /// Fills one `k`/`eq` column pair for bonds or angles.
    ///
    /// The raw list must cover every canonical tuple, may hold extra tuples,
    /// and must not repeat a tuple up to its canonical form.
    fn bonded_terms<'r, const N: usize>(
        &self,
        class: InteractionClass,
        required: &[[AtomId; N]],
        raw: impl Iterator<Item = (&'r [u32], f64, f64)>,
        addressing: Addressing,
        raw_len: usize,
    ) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>), CanonicalizationError> {
        if raw_len < required.len() {
            return Err(CanonicalizationError::malformed(
                class,
                format!(
                    "{raw_len} raw entries cannot cover {} required tuples",
                    required.len()
                ),
            ));
        }

        let mut lookup: HashMap<[AtomId; N], (f64, f64)> = HashMap::with_capacity(raw_len);
        for (atoms, k, eq) in raw {
            let atoms: [u32; N] = atoms.try_into().map_err(|_| {
                CanonicalizationError::malformed(class, format!("expected {N} atoms, got {atoms:?}"))
            })?;
            let tuple = canonical_bonded(self.resolve_tuple(class, &atoms, addressing)?);
            match lookup.entry(tuple) {
                Entry::Occupied(_) => {
                    return Err(CanonicalizationError::malformed(
                        class,
                        format!("tuple {atoms:?} is listed more than once"),
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert((k, eq));
                }
            }
        }

        let mut ks = Vec::with_capacity(required.len());
        let mut eqs = Vec::with_capacity(required.len());
        for tuple in required {
            let &(k, eq) = lookup.get(&canonical_bonded(*tuple)).ok_or_else(|| {
                CanonicalizationError::malformed(
                    class,
                    format!("no parameters for {:?}", tuple.map(AtomId::value)),
                )
            })?;
            ks.push(Some(k));
            eqs.push(Some(eq));
        }
        let extra = lookup.len() - required.len();
        if extra > 0 {
            debug!("Ignoring {extra} raw {class} entries outside the topology");
        }
        Ok((ks, eqs))
    }

    fn resolve_tuple<const N: usize>(
        &self,
        class: InteractionClass,
        atoms: &[u32; N],
        addressing: Addressing,
    ) -> Result<[AtomId; N], CanonicalizationError> {
        let mut tuple = [AtomId::default(); N];
        for (slot, &value) in tuple.iter_mut().zip(atoms) {
            *slot = match addressing {
                Addressing::Index => usize::try_from(value)
                    .ok()
                    .and_then(|i| self.topology.atoms().get(i).copied()),
                Addressing::AtomId => Some(AtomId(value)).filter(|&a| self.topology.contains_atom(a)),
            }
            .ok_or_else(|| {
                CanonicalizationError::malformed(
                    class,
                    format!("atom reference {value} in {atoms:?} is outside the molecule"),
                )
            })?;
        }
        Ok(tuple)
    }
}

/// Canonical form for bonds and angles: reverse when the first endpoint is
/// larger than the last.
fn canonical_bonded<const N: usize>(mut tuple: [AtomId; N]) -> [AtomId; N] {
    if N > 1 && tuple[0] > tuple[N - 1] {
        tuple.reverse();
    }
    tuple
}

/// Torsion tables under construction, plus which cells already hold a term.
struct TorsionAccumulator<'a> {
    topology: &'a MoleculeTopology,
    config: &'a CanonicalizationConfig,
    resolver: ImproperSymmetryResolver<'a>,
    proper: FourierTable,
    improper: FourierTable,
    improper_assigned: Vec<bool>,
    proper_assigned: Vec<bool>,
}

impl<'a> TorsionAccumulator<'a> {
    fn new(topology: &'a MoleculeTopology, config: &'a CanonicalizationConfig) -> Self {
        let n_propers = topology.propers().len();
        let n_impropers = topology.impropers().len();
        Self {
            topology,
            config,
            resolver: ImproperSymmetryResolver::new(topology, config.phase_tolerance),
            proper: FourierTable::zeroed(n_propers, config.n_periodicity_proper),
            improper: FourierTable::zeroed(n_impropers, config.n_periodicity_improper),
            proper_assigned: vec![false; n_propers * config.n_periodicity_proper],
            improper_assigned: vec![false; n_impropers * config.n_periodicity_improper],
        }
    }

    /// Adds a proper term; repeated claims on one cell accumulate when their
    /// phases agree.
    fn add_proper(
        &mut self,
        tuple: TorsionTuple,
        term: &RawTorsion,
    ) -> Result<(), CanonicalizationError> {
        let class = InteractionClass::Proper;
        let (k, phase) = normalize_sign(term.k, term.phase);
        let canonical = canonical_proper(tuple);
        let row = self.topology.proper_row(&canonical).ok_or_else(|| {
            CanonicalizationError::MatchFailure {
                class,
                tuple: ids(&canonical),
            }
        })?;
        let column = column_of(class, &canonical, term.periodicity, self.config.n_periodicity_proper)?;

        let cell = row * self.proper.n_periodicity() + column;
        if !self.proper_assigned[cell] {
            self.proper_assigned[cell] = true;
            self.proper.set(row, column, k, phase);
            return Ok(());
        }

        let existing_k = self.proper.k(row, column).unwrap_or_default();
        let existing_phase = self.proper.phase(row, column).unwrap_or_default();
        if !phases_agree(existing_phase, phase, self.config.phase_tolerance) {
            return Err(CanonicalizationError::SymmetryConflict {
                class,
                tuple: ids(&canonical),
                periodicity: term.periodicity,
                detail: format!("phase {phase:.4} disagrees with earlier phase {existing_phase:.4}"),
            });
        }
        self.proper.set(row, column, existing_k + k, existing_phase);
        Ok(())
    }

    /// Adds an improper term. Returns `Ok(false)` when the term was skipped
    /// under `allow_skip_improper`.
    fn add_improper(
        &mut self,
        tuple: TorsionTuple,
        term: &RawTorsion,
    ) -> Result<bool, CanonicalizationError> {
        let class = InteractionClass::Improper;
        let (k, phase) = normalize_sign(term.k, term.phase);
        let column = column_of(class, &tuple, term.periodicity, self.config.n_periodicity_improper)?;
        let (row, sign, canonical) = match self.resolver.resolve(&tuple, phase) {
            ImproperResolution::Resolved { row, sign, tuple } => (row, sign, tuple),
            ImproperResolution::IncompatibleSide { central_slot } => {
                if self.config.allow_skip_improper {
                    debug!("Skipping improper {:?} centered at slot {central_slot}", ids(&tuple));
                    return Ok(false);
                }
                return Err(CanonicalizationError::IncompatibleCentralSlot {
                    tuple: ids(&tuple),
                    raw_slot: central_slot,
                    central_idx: self.config.central_idx,
                });
            }
            ImproperResolution::NoMatch => {
                if self.config.allow_skip_improper {
                    debug!("Skipping improper {:?} without a canonical match", ids(&tuple));
                    return Ok(false);
                }
                return Err(CanonicalizationError::MatchFailure {
                    class,
                    tuple: ids(&tuple),
                });
            }
        };

        let cell = row * self.improper.n_periodicity() + column;
        if self.improper_assigned[cell] {
            return Err(CanonicalizationError::SymmetryConflict {
                class,
                tuple: ids(&canonical),
                periodicity: term.periodicity,
                detail: "cell already assigned".to_string(),
            });
        }
        self.improper_assigned[cell] = true;
        let phase = if sign < 0 { reduce(phase + PI) } else { phase };
        self.improper.set(row, column, k, phase);
        Ok(true)
    }
}

fn column_of(
    class: InteractionClass,
    tuple: &TorsionTuple,
    periodicity: u32,
    max: usize,
) -> Result<usize, CanonicalizationError> {
    let column = (periodicity as usize).checked_sub(1).filter(|&c| c < max);
    column.ok_or_else(|| CanonicalizationError::PeriodicityOverflow {
        class,
        tuple: ids(tuple),
        periodicity,
        max,
    })
}

fn ids(tuple: &TorsionTuple) -> Vec<u32> {
    tuple.iter().map(|a| a.value()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::error::ErrorKind;
    use crate::core::forcefield::parameters::SignedExportPolicy;
    use crate::core::forcefield::raw::{RawAngle, RawBond};
    use crate::core::models::ids::atom_ids;
    use std::f64::consts::TAU;

    const TOL: f64 = 1e-9;

    fn topology(atoms: &[u32], bonds: &[(u32, u32)]) -> MoleculeTopology {
        let bonds: Vec<_> = bonds.iter().map(|&(a, b)| (AtomId(a), AtomId(b))).collect();
        MoleculeTopology::from_connectivity(atom_ids(atoms), &bonds, 2).unwrap()
    }

    // Chain 0-1-2-3.
    fn chain() -> MoleculeTopology {
        topology(&[0, 1, 2, 3], &[(0, 1), (1, 2), (2, 3)])
    }

    // Center 0 bonded to 1, 2, 3.
    fn star() -> MoleculeTopology {
        topology(&[0, 1, 2, 3], &[(0, 1), (0, 2), (0, 3)])
    }

    fn chain_raw() -> RawParameterSet {
        RawParameterSet {
            addressing: Addressing::Index,
            bonds: vec![
                RawBond::new([1, 0], 300.0, 1.5),
                RawBond::new([2, 1], 310.0, 1.4),
                RawBond::new([3, 2], 320.0, 1.3),
            ],
            angles: vec![
                RawAngle::new([2, 1, 0], 60.0, 1.9),
                RawAngle::new([1, 2, 3], 70.0, 2.0),
            ],
            torsions: vec![],
        }
    }

    fn star_raw(torsions: Vec<RawTorsion>) -> RawParameterSet {
        RawParameterSet {
            addressing: Addressing::Index,
            bonds: vec![
                RawBond::new([0, 1], 500.0, 1.2),
                RawBond::new([0, 2], 340.0, 1.1),
                RawBond::new([0, 3], 340.0, 1.1),
            ],
            angles: vec![
                RawAngle::new([1, 0, 2], 50.0, 2.1),
                RawAngle::new([1, 0, 3], 50.0, 2.1),
                RawAngle::new([2, 0, 3], 40.0, 2.0),
            ],
            torsions,
        }
    }

    fn run(
        topology: &MoleculeTopology,
        raw: &RawParameterSet,
        config: CanonicalizationConfig,
    ) -> Result<Parameters, CanonicalizationError> {
        ParameterCanonicalizer::new(topology, &config)?.canonicalize(raw)
    }

    #[test]
    fn bond_orientation_does_not_matter() {
        let topology = topology(&[1, 2, 3], &[(2, 3)]);
        for atoms in [[3, 2], [2, 3]] {
            let raw = RawParameterSet {
                addressing: Addressing::AtomId,
                bonds: vec![RawBond::new(atoms, 90.0, 1.4)],
                ..Default::default()
            };
            let params = run(&topology, &raw, CanonicalizationConfig::default()).unwrap();
            assert_eq!(params.bonds(), &[[AtomId(2), AtomId(3)]]);
            assert_eq!(params.bond_k(), &[Some(90.0)]);
            assert_eq!(params.bond_eq(), &[Some(1.4)]);
        }
    }

    #[test]
    fn bonds_and_angles_follow_topology_rows() {
        let params = run(&chain(), &chain_raw(), CanonicalizationConfig::default()).unwrap();
        assert_eq!(params.bond_k(), &[Some(300.0), Some(310.0), Some(320.0)]);
        assert_eq!(params.angle_k(), &[Some(60.0), Some(70.0)]);
        assert_eq!(params.angle_eq(), &[Some(1.9), Some(2.0)]);
    }

    #[test]
    fn superset_raw_lists_are_accepted() {
        let mut raw = chain_raw();
        raw.bonds.push(RawBond::new([0, 3], 1.0, 1.0));
        let params = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap();
        assert_eq!(params.bond_k().len(), 3);
    }

    #[test]
    fn malformed_bonded_input_is_rejected() {
        let config = CanonicalizationConfig::default();

        let mut short = chain_raw();
        short.bonds.pop();
        let err = run(&chain(), &short, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let mut duplicated = chain_raw();
        duplicated.bonds.push(RawBond::new([0, 1], 1.0, 1.0));
        let err = run(&chain(), &duplicated, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let mut out_of_range = chain_raw();
        out_of_range.angles[0].atoms = [2, 1, 9];
        let err = run(&chain(), &out_of_range, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let mut absent = chain_raw();
        absent.bonds[2] = RawBond::new([0, 3], 1.0, 1.0);
        let err = run(&chain(), &absent, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn proper_terms_accumulate_at_matching_phase() {
        let mut raw = chain_raw();
        raw.torsions = vec![
            RawTorsion::new([0, 1, 2, 3], 2, 0.0, 1.0),
            RawTorsion::new([3, 2, 1, 0], 2, 0.0, 2.0),
            RawTorsion::new([0, 1, 2, 3], 1, PI, 0.5),
        ];
        let params = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap();
        let table = params.proper_table();
        assert_eq!(table.rows(), 1);
        assert_eq!(table.k(0, 1), Some(3.0));
        assert_eq!(table.phase(0, 1), Some(0.0));
        assert_eq!(table.k(0, 0), Some(0.5));
        assert_eq!(table.k(0, 5), Some(0.0));
    }

    #[test]
    fn negative_proper_coefficient_is_stored_with_shifted_phase() {
        let mut raw = chain_raw();
        raw.torsions = vec![RawTorsion::new([0, 1, 2, 3], 3, 0.0, -1.5)];
        let params = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap();
        assert_eq!(params.proper_table().k(0, 2), Some(1.5));
        assert!((params.proper_table().phase(0, 2).unwrap() - PI).abs() < TOL);

        let signed = params
            .signed_proper_ks(1e-2, SignedExportPolicy::Strict, None)
            .unwrap();
        assert_eq!(signed.row(0)[2], Some(-1.5));
    }

    #[test]
    fn proper_phase_conflict_is_fatal() {
        let mut raw = chain_raw();
        raw.torsions = vec![
            RawTorsion::new([0, 1, 2, 3], 2, 0.0, 1.0),
            RawTorsion::new([0, 1, 2, 3], 2, PI / 2.0, 1.0),
        ];
        let err = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymmetryConflict);
    }

    #[test]
    fn proper_phase_agreement_wraps_around() {
        let mut raw = chain_raw();
        raw.torsions = vec![
            RawTorsion::new([0, 1, 2, 3], 2, 0.0, 1.0),
            RawTorsion::new([0, 1, 2, 3], 2, TAU - 1e-3, 1.0),
        ];
        let params = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap();
        assert_eq!(params.proper_table().k(0, 1), Some(2.0));
    }

    #[test]
    fn periodicity_outside_range_is_rejected() {
        for periodicity in [0, 7] {
            let mut raw = chain_raw();
            raw.torsions = vec![RawTorsion::new([0, 1, 2, 3], periodicity, 0.0, 1.0)];
            let err = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PeriodicityOverflow);
        }

        let raw = star_raw(vec![RawTorsion::new([1, 2, 0, 3], 4, 0.0, 1.0)]);
        let err = run(&star(), &raw, CanonicalizationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PeriodicityOverflow);
    }

    #[test]
    fn zero_coefficients_are_ignored() {
        let mut raw = chain_raw();
        raw.torsions = vec![RawTorsion::new([0, 1, 2, 3], 9, 0.3, 0.0)];
        let topology = chain();
        let canonicalizer =
            ParameterCanonicalizer::new(&topology, &CanonicalizationConfig::default()).unwrap();
        let (params, report) = canonicalizer.canonicalize_with_report(&raw).unwrap();
        assert_eq!(report.zero_terms, 1);
        assert!(params.proper_table().ks().iter().all(|k| *k == Some(0.0)));
    }

    #[test]
    fn unbonded_torsion_has_no_match() {
        let mut raw = chain_raw();
        raw.torsions = vec![RawTorsion::new([0, 2, 1, 3], 1, 0.0, 1.0)];
        let err = run(&chain(), &raw, CanonicalizationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::MatchFailure {
                class: InteractionClass::Proper,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::MatchFailure);
    }

    #[test]
    fn reversed_improper_gives_identical_terms() {
        let forward = star_raw(vec![RawTorsion::new([1, 2, 0, 3], 2, PI, 1.1)]);
        let reversed = star_raw(vec![RawTorsion::new([3, 0, 2, 1], 2, PI, 1.1)]);
        let config = CanonicalizationConfig::default();
        let a = run(&star(), &forward, config).unwrap();
        let b = run(&star(), &reversed, config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.improper_table().k(0, 1), Some(1.1));
    }

    #[test]
    fn inner_swap_negates_signed_coefficient() {
        let config = CanonicalizationConfig::default();
        let direct = run(
            &star(),
            &star_raw(vec![RawTorsion::new([1, 2, 0, 3], 2, 0.0, 1.1)]),
            config,
        )
        .unwrap();
        let swapped = run(
            &star(),
            &star_raw(vec![RawTorsion::new([1, 0, 2, 3], 2, 0.0, 1.1)]),
            config,
        )
        .unwrap();

        let direct_signed = direct
            .signed_improper_ks(1e-2, SignedExportPolicy::Strict, None)
            .unwrap();
        let swapped_signed = swapped
            .signed_improper_ks(1e-2, SignedExportPolicy::Strict, None)
            .unwrap();
        assert_eq!(direct_signed.row(0)[1], Some(1.1));
        assert_eq!(swapped_signed.row(0)[1], Some(-1.1));
        assert_eq!(swapped.improper_table().k(0, 1), Some(1.1));
    }

    #[test]
    fn inner_swap_with_general_phase_has_no_match() {
        let raw = star_raw(vec![RawTorsion::new([1, 0, 2, 3], 2, 1.0, 1.1)]);
        let err = run(&star(), &raw, CanonicalizationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::MatchFailure {
                class: InteractionClass::Improper,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_improper_assignment_is_fatal() {
        let raw = star_raw(vec![
            RawTorsion::new([1, 2, 0, 3], 2, 0.0, 1.0),
            RawTorsion::new([3, 0, 2, 1], 2, 0.0, 1.0),
        ]);
        let err = run(&star(), &raw, CanonicalizationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymmetryConflict);

        let lenient = CanonicalizationConfig {
            allow_skip_improper: true,
            ..CanonicalizationConfig::default()
        };
        let err = run(&star(), &raw, lenient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymmetryConflict);
    }

    #[test]
    fn incompatible_central_slot_respects_skip_policy() {
        let raw = star_raw(vec![
            RawTorsion::new([0, 1, 2, 3], 2, 0.0, 1.0),
            RawTorsion::new([2, 3, 0, 1], 1, 0.0, 0.7),
        ]);

        let strict = CanonicalizationConfig::default();
        let err = run(&star(), &raw, strict).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::IncompatibleCentralSlot { raw_slot: 0, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::MatchFailure);

        let lenient = CanonicalizationConfig {
            allow_skip_improper: true,
            ..strict
        };
        let topology = star();
        let (params, report) = ParameterCanonicalizer::new(&topology, &lenient)
            .unwrap()
            .canonicalize_with_report(&raw)
            .unwrap();
        assert_eq!(report.skipped_impropers, 1);
        assert_eq!(params.improper_table().k(1, 0), Some(0.7));
        let total: f64 = params.improper_table().ks().iter().flatten().sum();
        assert!((total - 0.7).abs() < TOL);
    }

    #[test]
    fn improper_periodicity_is_checked_before_resolution() {
        let lenient = CanonicalizationConfig {
            allow_skip_improper: true,
            ..CanonicalizationConfig::default()
        };
        let incompatible = star_raw(vec![RawTorsion::new([0, 1, 2, 3], 5, 0.0, 1.0)]);
        let err = run(&star(), &incompatible, lenient).unwrap_err();
        assert!(matches!(
            err,
            CanonicalizationError::PeriodicityOverflow { periodicity: 5, .. }
        ));

        let unmatched = star_raw(vec![RawTorsion::new([1, 0, 2, 3], 4, 1.0, 1.0)]);
        let err = run(&star(), &unmatched, lenient).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PeriodicityOverflow);
    }

    #[test]
    fn canonicalization_is_idempotent_over_canonical_input() {
        let topology = star();
        let raw = star_raw(vec![RawTorsion::new([2, 1, 0, 3], 1, PI, 0.4)]);
        let config = CanonicalizationConfig::default();
        let first = run(&topology, &raw, config).unwrap();

        let again = topology.clone().canonicalized();
        let second = run(&again, &raw, config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn mismatched_central_index_is_rejected() {
        let topology = star();
        let config = CanonicalizationConfig {
            central_idx: 1,
            ..Default::default()
        };
        assert!(matches!(
            ParameterCanonicalizer::new(&topology, &config),
            Err(CanonicalizationError::InvalidConfig { .. })
        ));
    }
}
