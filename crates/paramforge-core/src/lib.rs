//! # paramforge
//!
//! Builds canonical molecular-mechanics datasets: quantum-chemistry conformers
//! aligned onto a single atom order, paired with classical force-field
//! parameters rewritten into one canonical, symmetry-resolved form.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularGraph`,
//!   `MoleculeTopology`), parameter canonicalization (`ParameterCanonicalizer`,
//!   `ImproperSymmetryResolver`), graph isomorphism matching and file formats.
//!
//! - **[`engine`]: The Logic Core.** Configuration, progress reporting and the
//!   `DatasetAssembler`, which turns one molecule directory into a canonical
//!   record.
//!
//! - **[`workflows`]: The Public API.** The batch build over a directory of
//!   molecules, with summary reporting.

pub mod core;
pub mod engine;
pub mod workflows;
