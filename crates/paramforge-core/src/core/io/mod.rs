//! Provides input/output for conformer sources, classical topologies and
//! canonical molecule records.
//!
//! All formats are JSON documents. Readers sit behind the [`traits::ConformerReader`]
//! and [`traits::TopologyReader`] traits so other file layouts can be plugged
//! into the dataset assembler; records are written as named dense arrays.

pub mod arrays;
pub mod error;
pub mod formats;
pub mod record;
pub mod traits;
