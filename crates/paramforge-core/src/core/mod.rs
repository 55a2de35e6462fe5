//! # Core Module
//!
//! Stateless data models and algorithms for canonicalizing molecular-mechanics
//! parameters and aligning atom orderings across data sources.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atom ids, elements, labeled graphs and conformers
//! - **Structural Knowledge** ([`topology`]) - Canonically ordered bonds, angles and torsions
//! - **Parameter Canonicalization** ([`forcefield`]) - Raw terms mapped onto topology rows
//! - **Graph Matching** ([`graph`]) - Isomorphism-based atom alignment and bond perception
//! - **File I/O** ([`io`]) - Conformer and topology readers, canonical record writer
//!
//! ## Key Capabilities
//!
//! - **Deterministic per-molecule parameter layout** independent of input ordering
//! - **Symmetry-aware improper torsion resolution** with sign and phase constraints
//! - **Atom-order alignment** of heterogeneous sources via VF2 graph isomorphism

pub mod forcefield;
pub mod graph;
pub mod io;
pub mod models;
pub mod topology;
