use crate::core::models::ids::AtomId;
use std::fmt;

pub type BondTuple = [AtomId; 2];
pub type AngleTuple = [AtomId; 3];
pub type TorsionTuple = [AtomId; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionClass {
    Bond,
    Angle,
    Proper,
    Improper,
}

impl fmt::Display for InteractionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Bond => "bond",
                Self::Angle => "angle",
                Self::Proper => "proper torsion",
                Self::Improper => "improper torsion",
            }
        )
    }
}

/// Bonds are stored with ascending atom ids.
#[inline]
pub fn canonical_bond([a, b]: BondTuple) -> BondTuple {
    if a <= b { [a, b] } else { [b, a] }
}

/// Angles keep their apex in the middle; the smaller endpoint comes first.
#[inline]
pub fn canonical_angle([a, b, c]: AngleTuple) -> AngleTuple {
    if a <= c { [a, b, c] } else { [c, b, a] }
}

/// A dihedral angle is invariant under reversal of its four atoms, so the
/// representative with the smaller first endpoint is kept.
#[inline]
pub fn canonical_proper([a, b, c, d]: TorsionTuple) -> TorsionTuple {
    if a <= d { [a, b, c, d] } else { [d, c, b, a] }
}

/// Places `center` at `central_idx` and fills the remaining slots with
/// `substituents` in order.
pub fn improper_with_center(
    center: AtomId,
    substituents: [AtomId; 3],
    central_idx: usize,
) -> TorsionTuple {
    let mut tuple = [center; 4];
    let mut rest = substituents.into_iter();
    for (slot, entry) in tuple.iter_mut().enumerate() {
        if slot != central_idx {
            if let Some(atom) = rest.next() {
                *entry = atom;
            }
        }
    }
    tuple
}

/// Returns the tuple rearranged by `permutation` (`out[i] = tuple[permutation[i]]`).
#[inline]
pub fn permute_torsion(tuple: &TorsionTuple, permutation: &[usize; 4]) -> TorsionTuple {
    [
        tuple[permutation[0]],
        tuple[permutation[1]],
        tuple[permutation[2]],
        tuple[permutation[3]],
    ]
}
