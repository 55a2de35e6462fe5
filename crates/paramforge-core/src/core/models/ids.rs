use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable per-molecule atom identifier.
///
/// An `AtomId` is independent of the atom's position in any array; ids are
/// neither required to be contiguous nor to start at zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AtomId(pub u32);

impl AtomId {
    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for AtomId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts a slice of raw integers into atom ids, preserving order.
pub fn atom_ids(values: &[u32]) -> Vec<AtomId> {
    values.iter().copied().map(AtomId).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_ids_order_by_value() {
        assert!(AtomId(2) < AtomId(10));
        assert_eq!(AtomId::from(7).value(), 7);
    }

    #[test]
    fn atom_ids_serialize_transparently() {
        let json = serde_json::to_string(&atom_ids(&[3, 1, 4])).unwrap();
        assert_eq!(json, "[3,1,4]");
        let back: Vec<AtomId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![AtomId(3), AtomId(1), AtomId(4)]);
    }

    #[test]
    fn display_prints_raw_value() {
        assert_eq!(AtomId(42).to_string(), "42");
    }
}
