//! # Engine Module
//!
//! Per-molecule assembly of canonical dataset records.
//!
//! ## Overview
//!
//! A molecule directory holds one or more quantum-chemistry conformer files and,
//! optionally, a classical topology with raw force-field parameters. The engine
//! reads them, aligns every source onto a common atom order, keeps only complete
//! conformers, reorders them into the topology's atom order and attaches the
//! canonicalized parameters.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Directory layout, bond perception and canonicalization settings
//! - **Assembly** ([`assembler`]) - The [`assembler::DatasetAssembler`] driving one molecule at a time
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Failures fatal to a molecule, classified for the build summary

pub mod assembler;
pub mod config;
pub mod error;
pub mod progress;
