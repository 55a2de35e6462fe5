//! Graph utilities for aligning independently ordered descriptions of one molecule.
//!
//! - [`matcher`] - Isomorphism-based atom order alignment with a deterministic tie-break
//! - [`perception`] - Distance-based bond perception from covalent radii

pub mod matcher;
pub mod perception;
