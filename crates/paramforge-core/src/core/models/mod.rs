//! # Core Models Module
//!
//! Plain data structures shared by every other layer of the library.
//!
//! - [`ids`] - Stable atom identifiers, independent of array positions
//! - [`element`] - Element symbols, atomic numbers and covalent radii
//! - [`graph`] - Labeled molecular graphs over positional indices, plus permutation helpers
//! - [`conformer`] - Geometries with energies and gradients, grouped by source file

pub mod conformer;
pub mod element;
pub mod graph;
pub mod ids;
