//! # Workflows Module
//!
//! High-level entry points that run a complete dataset build.
//!
//! - **Build Workflow** ([`build`]) - Discovers molecule directories, assembles
//!   each one (in parallel with the `parallel` feature), collects the written
//!   records and writes a per-molecule CSV summary.

pub mod build;
