//! # Topology Module
//!
//! Canonical interaction tuples of a single molecule.
//!
//! ## Overview
//!
//! A [`MoleculeTopology`](molecule::MoleculeTopology) is derived once from atom
//! connectivity and holds every bond, angle, proper torsion and improper
//! torsion of the molecule exactly once, in a canonical order:
//!
//! - **Bonds** ascending by atom id
//! - **Angles** with the smaller endpoint first and the apex in the middle
//! - **Proper torsions** with the smaller endpoint first (reversal invariance)
//! - **Improper torsions** with the central atom at a configured slot, one
//!   tuple per cyclic permutation of the three substituents
//!
//! Each list is additionally sorted so the representation is unique. Row
//! lookups keyed by canonical tuples are built at construction and used by
//! the parameter canonicalizer.
//!
//! ## Key Components
//!
//! - [`molecule`] - The topology type, its validation and torsion classification
//! - [`tuples`] - Tuple aliases and the per-class canonical ordering rules

pub mod molecule;
pub mod tuples;
