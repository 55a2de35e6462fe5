//! # Force Field Module
//!
//! Canonicalization of classical force-field parameters.
//!
//! ## Overview
//!
//! Raw bond, angle and torsion terms arrive in arbitrary atom order, possibly
//! as a superset of what a molecule needs, and with torsions listed once per
//! periodicity. This module maps them onto the canonical rows of a
//! [`MoleculeTopology`](crate::core::topology::molecule::MoleculeTopology):
//!
//! - **Bonds and angles** are looked up by their canonical tuple
//! - **Proper torsions** are reversed into canonical order; repeated terms at
//!   one periodicity accumulate when their phases agree
//! - **Improper torsions** are resolved through their permutation symmetries
//!   (reversal, and the inner swap for phases that are multiples of π)
//!
//! Fourier coefficients are always stored non-negative, with the sign folded
//! into the phase. [`parameters::Parameters`] can re-express them as signed
//! coefficients when every phase is a multiple of π.
//!
//! ## Key Components
//!
//! - [`canonicalize`] - The [`ParameterCanonicalizer`](canonicalize::ParameterCanonicalizer)
//! - [`improper`] - Permutation search for improper torsions
//! - [`parameters`] - Canonical output and its named-array form
//! - [`raw`] - Closed input record for raw parameter lists
//! - [`phase`] - Phase reduction and the signed-coefficient conversion
//! - [`config`] - Periodicity limits, central slot and tolerances
//! - [`error`] - Failure classes shared by the canonicalization steps

pub mod canonicalize;
pub mod config;
pub mod error;
pub mod improper;
pub mod parameters;
pub mod phase;
pub mod raw;
