use super::phase::is_multiple_of_pi;
use crate::core::topology::molecule::{MoleculeTopology, TorsionKind};
use crate::core::topology::tuples::{TorsionTuple, permute_torsion};

/// Index permutations tried in order, with the sign they imply.
///
/// Reversal leaves an improper dihedral unchanged; swapping the two inner
/// atoms negates it, which is only an energy symmetry for phases 0 and π.
const CANDIDATES: [(i8, [usize; 4]); 4] = [
    (1, [0, 1, 2, 3]),
    (1, [3, 2, 1, 0]),
    (-1, [0, 2, 1, 3]),
    (-1, [3, 1, 2, 0]),
];

/// Outcome of mapping a raw improper tuple onto the canonical impropers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImproperResolution {
    Resolved {
        row: usize,
        /// `-1` when the match required an inner swap.
        sign: i8,
        tuple: TorsionTuple,
    },
    /// The raw central atom sits on the other side (endpoints versus inner
    /// slots) than the configured central slot.
    IncompatibleSide { central_slot: usize },
    NoMatch,
}

/// Finds the canonical improper row that a raw improper tuple describes.
///
/// The resolver only reports; whether an unresolved tuple is skipped or
/// fatal is the caller's decision.
#[derive(Debug, Clone, Copy)]
pub struct ImproperSymmetryResolver<'a> {
    topology: &'a MoleculeTopology,
    central_idx: usize,
    phase_tolerance: f64,
}

impl<'a> ImproperSymmetryResolver<'a> {
    pub fn new(topology: &'a MoleculeTopology, phase_tolerance: f64) -> Self {
        Self {
            topology,
            central_idx: topology.central_idx(),
            phase_tolerance,
        }
    }

    /// Resolves `tuple`, whose term has the given (sign-normalized) `phase`.
    ///
    /// The raw central slot is determined from connectivity. Sign `-1`
    /// candidates are only considered when the phase is within tolerance of
    /// 0, π or 2π.
    pub fn resolve(&self, tuple: &TorsionTuple, phase: f64) -> ImproperResolution {
        let central_slot = match self.topology.classify_torsion(tuple) {
            TorsionKind::Improper { central_slot } => central_slot,
            TorsionKind::Proper | TorsionKind::Unbonded => return ImproperResolution::NoMatch,
        };
        if is_endpoint(central_slot) != is_endpoint(self.central_idx) {
            return ImproperResolution::IncompatibleSide { central_slot };
        }

        let sign_flip_allowed = is_multiple_of_pi(phase, self.phase_tolerance);
        CANDIDATES
            .iter()
            .filter(|(sign, _)| *sign > 0 || sign_flip_allowed)
            .find_map(|&(sign, permutation)| {
                let candidate = permute_torsion(tuple, &permutation);
                self.topology
                    .improper_row(&candidate)
                    .map(|row| ImproperResolution::Resolved {
                        row,
                        sign,
                        tuple: candidate,
                    })
            })
            .unwrap_or(ImproperResolution::NoMatch)
    }
}

#[inline]
fn is_endpoint(slot: usize) -> bool {
    slot == 0 || slot == 3
}
