use super::config::AssemblyConfig;
use super::error::AssemblyError;
use crate::core::forcefield::canonicalize::ParameterCanonicalizer;
use crate::core::forcefield::parameters::Parameters;
use crate::core::graph::matcher::{GraphIsomorphismMatcher, IsomorphismOracle, Vf2Oracle};
use crate::core::io::formats::ClassicalTopology;
use crate::core::io::record::MolRecord;
use crate::core::io::traits::{ConformerReader, JsonReader, TopologyReader};
use crate::core::models::conformer::{Conformer, ConformerSource};
use crate::core::models::graph::{MolecularGraph, apply_permutation};
use crate::core::models::ids::AtomId;
use crate::core::topology::molecule::MoleculeTopology;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one molecule.
#[derive(Debug, Clone, PartialEq)]
pub enum MoleculeOutcome {
    Written { path: PathBuf, record: MolRecord },
    /// The output file already existed and `overwrite` was off.
    SkippedExisting { path: PathBuf },
    /// Not enough usable data to form a complete record.
    Incomplete { reason: String },
}

impl MoleculeOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::SkippedExisting { .. } => "skipped-existing",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}

/// Conformer data of one molecule merged into a single atom order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConformers {
    pub atomic_numbers: Vec<u8>,
    pub graph: MolecularGraph,
    pub conformers: Vec<Conformer>,
}

/// Turns one molecule directory into a canonical [`MolRecord`].
///
/// Each molecule is processed independently; [`process`](Self::process) only
/// needs `&self` and may run on many threads at once. Written records are
/// collected afterwards with [`insert`](Self::insert).
pub struct DatasetAssembler<'a, R = JsonReader, O = Vf2Oracle> {
    config: &'a AssemblyConfig,
    reader: R,
    matcher: GraphIsomorphismMatcher<O>,
    entries: BTreeMap<String, MolRecord>,
}

impl<'a> DatasetAssembler<'a> {
    pub fn new(config: &'a AssemblyConfig) -> Self {
        Self::with_components(config, JsonReader, Vf2Oracle::new(config.max_mappings))
    }
}

impl<'a, R, O> DatasetAssembler<'a, R, O>
where
    R: ConformerReader + TopologyReader,
    O: IsomorphismOracle,
{
    pub fn with_components(config: &'a AssemblyConfig, reader: R, oracle: O) -> Self {
        Self {
            config,
            reader,
            matcher: GraphIsomorphismMatcher::new(oracle),
            entries: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &AssemblyConfig {
        self.config
    }

    pub fn output_path(&self, mol_id: &str) -> PathBuf {
        self.config.output_dir.join(format!("{mol_id}.json"))
    }

    /// Builds and writes the record of one molecule directory.
    ///
    /// An existing output is detected before any input is read.
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] for failures that are fatal to this
    /// molecule: unreadable topology, topology mismatch, canonicalization
    /// errors and write failures.
    pub fn process(&self, mol_id: &str, dir: &Path) -> Result<MoleculeOutcome, AssemblyError> {
        let path = self.output_path(mol_id);
        if path.exists() && !self.config.overwrite {
            info!(mol_id, "Output already exists; skipping.");
            return Ok(MoleculeOutcome::SkippedExisting { path });
        }

        let record = match self.assemble_molecule(mol_id, dir)? {
            Ok(record) => record,
            Err(reason) => {
                warn!(mol_id, "Molecule is incomplete: {}", reason);
                return Ok(MoleculeOutcome::Incomplete { reason });
            }
        };
        self.write_record(&record, &path)?;
        info!(
            mol_id,
            conformers = record.conformer_count(),
            "Wrote canonical record."
        );
        Ok(MoleculeOutcome::Written { path, record })
    }

    /// Assembles a record without writing it.
    ///
    /// The inner `Err` carries the reason a molecule is incomplete, which is
    /// not an error of the batch.
    pub fn assemble_molecule(
        &self,
        mol_id: &str,
        dir: &Path,
    ) -> Result<Result<MolRecord, String>, AssemblyError> {
        let merged = match self.merge_sources(mol_id, &self.conformer_files(dir)?) {
            Some(merged) => merged,
            None => return Ok(Err("no conformers with energy and gradient".to_string())),
        };

        let topology_path = dir.join(&self.config.topology_file_name);
        if topology_path.is_file() {
            let classical = self.reader.read_topology(&topology_path)?;
            return self.augment(mol_id, merged, &classical).map(Ok);
        }
        if self.config.require_topology {
            return Ok(Err(format!(
                "no classical topology '{}'",
                self.config.topology_file_name
            )));
        }

        debug!(mol_id, "No classical topology; attaching placeholder parameters.");
        let topology = self.perceived_topology(mol_id, &merged.graph)?;
        Ok(Ok(MolRecord {
            mol_id: mol_id.to_string(),
            atomic_numbers: merged.atomic_numbers,
            conformers: merged.conformers,
            partial_charges: None,
            parameters: Parameters::placeholder(&topology, &self.config.canonicalization),
        }))
    }

    /// Lists the conformer files of a molecule directory in name order.
    fn conformer_files(&self, dir: &Path) -> Result<Vec<PathBuf>, AssemblyError> {
        let fs_err = |source| AssemblyError::FileSystem {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(fs_err)? {
            let path = entry.map_err(fs_err)?.path();
            let is_conformer_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(&self.config.conformer_suffix));
            if is_conformer_file && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Reads and aligns every conformer source of a molecule.
    ///
    /// Sources that cannot be read, have no conformers, or do not match the
    /// first usable source are dropped with a warning. Returns `None` when no
    /// complete conformer remains.
    pub fn merge_sources(&self, mol_id: &str, files: &[PathBuf]) -> Option<MergedConformers> {
        let mut sources: Vec<ConformerSource> = Vec::with_capacity(files.len());
        let mut graphs: Vec<MolecularGraph> = Vec::with_capacity(files.len());
        for file in files {
            let source = match self.reader.read_source(file) {
                Ok(source) if !source.conformers.is_empty() => source,
                Ok(_) => {
                    warn!(mol_id, file = %file.display(), "Source holds no conformers; dropping it.");
                    continue;
                }
                Err(e) => {
                    warn!(mol_id, "Dropping unreadable source: {}", e);
                    continue;
                }
            };
            match source.graph(self.config.bond_tolerance) {
                Ok(graph) => {
                    graphs.push(graph);
                    sources.push(source);
                }
                Err(e) => {
                    warn!(mol_id, file = %file.display(), "Dropping source with invalid bonds: {}", e)
                }
            }
        }

        let alignment = self.matcher.align(&graphs).ok()?;
        let reference = sources.first()?;
        let n_atoms = reference.atom_count();
        let mut conformers = Vec::new();
        for (index, permutation) in &alignment.permutations {
            let source = &sources[*index];
            let complete = source
                .conformers
                .iter()
                .filter(|c| c.is_complete(n_atoms))
                .map(|c| c.permuted(permutation));
            let before = conformers.len();
            conformers.extend(complete);
            debug!(
                mol_id,
                file = %source.origin.display(),
                merged = conformers.len() - before,
                "Merged conformers from source."
            );
        }

        if conformers.is_empty() {
            return None;
        }
        Some(MergedConformers {
            atomic_numbers: reference.atomic_numbers.clone(),
            graph: graphs.swap_remove(0),
            conformers,
        })
    }

    /// Reorders merged data into the classical topology's atom order and
    /// canonicalizes its parameters.
    pub fn augment(
        &self,
        mol_id: &str,
        merged: MergedConformers,
        classical: &ClassicalTopology,
    ) -> Result<MolRecord, AssemblyError> {
        let topology_err = |source| AssemblyError::Topology {
            mol_id: mol_id.to_string(),
            source,
        };
        let topology = classical
            .molecule_topology(self.config.canonicalization.central_idx)
            .map_err(topology_err)?;
        let classical_graph = classical.graph().map_err(topology_err)?;

        let permutation = self
            .matcher
            .match_pair(&classical_graph, &merged.graph, 1)
            .map_err(|source| AssemblyError::Match {
                mol_id: mol_id.to_string(),
                source,
            })?;

        let canonicalization_err = |source| AssemblyError::Canonicalization {
            mol_id: mol_id.to_string(),
            source,
        };
        let canonicalizer =
            ParameterCanonicalizer::new(&topology, &self.config.canonicalization)
                .map_err(canonicalization_err)?;
        let (parameters, report) = canonicalizer
            .canonicalize_with_report(&classical.parameters)
            .map_err(canonicalization_err)?;
        if report.skipped_impropers > 0 {
            info!(
                mol_id,
                skipped = report.skipped_impropers,
                "Improper terms were skipped during canonicalization."
            );
        }

        Ok(MolRecord {
            mol_id: mol_id.to_string(),
            atomic_numbers: apply_permutation(&merged.atomic_numbers, &permutation),
            conformers: merged
                .conformers
                .iter()
                .map(|c| c.permuted(&permutation))
                .collect(),
            partial_charges: classical.partial_charges.clone(),
            parameters,
        })
    }

    /// Topology over positional atom ids, built from the perceived graph.
    fn perceived_topology(
        &self,
        mol_id: &str,
        graph: &MolecularGraph,
    ) -> Result<MoleculeTopology, AssemblyError> {
        let atoms: Vec<AtomId> = (0..graph.node_count() as u32).map(AtomId).collect();
        let bonds: Vec<(AtomId, AtomId)> = graph
            .edges()
            .iter()
            .map(|&(i, j)| (AtomId(i as u32), AtomId(j as u32)))
            .collect();
        MoleculeTopology::from_connectivity(atoms, &bonds, self.config.canonicalization.central_idx)
            .map_err(|source| AssemblyError::Topology {
                mol_id: mol_id.to_string(),
                source,
            })
    }

    /// Writes `record` to `path`, refusing to replace an existing file unless
    /// `overwrite` is set.
    pub fn write_record(&self, record: &MolRecord, path: &Path) -> Result<(), AssemblyError> {
        if path.exists() && !self.config.overwrite {
            return Err(AssemblyError::OutputExists {
                path: path.to_path_buf(),
            });
        }
        record.write_to_path(path)?;
        Ok(())
    }

    /// Registers a completed record.
    pub fn insert(&mut self, record: MolRecord) {
        self.entries.insert(record.mol_id.clone(), record);
    }

    pub fn entries(&self) -> &BTreeMap<String, MolRecord> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, MolRecord> {
        self.entries
    }
}
