use crate::core::io::record::MolRecord;
use crate::engine::assembler::{DatasetAssembler, MoleculeOutcome};
use crate::engine::config::{AssemblyConfig, SUMMARY_FILE};
use crate::engine::error::AssemblyError;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoleculeStatus {
    Written,
    SkippedExisting,
    Incomplete,
    Failed,
}

impl MoleculeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::SkippedExisting => "skipped-existing",
            Self::Incomplete => "incomplete",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeReport {
    pub mol_id: String,
    pub status: MoleculeStatus,
    pub conformers: usize,
    /// Reason for an incomplete or failed molecule, or the written path.
    pub detail: String,
    /// Error class of a failed molecule.
    pub error_kind: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildSummary {
    pub total: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub incomplete: usize,
    pub failed: usize,
    pub total_conformers: usize,
    pub failures_by_kind: BTreeMap<&'static str, usize>,
    pub molecules: Vec<MoleculeReport>,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    mol_id: &'a str,
    outcome: &'static str,
    conformers: usize,
    detail: &'a str,
}

impl BuildSummary {
    fn record(&mut self, report: MoleculeReport) {
        self.total += 1;
        match report.status {
            MoleculeStatus::Written => {
                self.written += 1;
                self.total_conformers += report.conformers;
            }
            MoleculeStatus::SkippedExisting => self.skipped_existing += 1,
            MoleculeStatus::Incomplete => self.incomplete += 1,
            MoleculeStatus::Failed => {
                self.failed += 1;
                if let Some(kind) = report.error_kind {
                    *self.failures_by_kind.entry(kind).or_default() += 1;
                }
            }
        }
        self.molecules.push(report);
    }

    /// Writes one CSV row per molecule.
    pub fn write_csv(&self, path: &Path) -> Result<(), AssemblyError> {
        let summary_err = |source| AssemblyError::Summary {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(summary_err)?;
        for report in &self.molecules {
            writer
                .serialize(SummaryRow {
                    mol_id: &report.mol_id,
                    outcome: report.status.as_str(),
                    conformers: report.conformers,
                    detail: &report.detail,
                })
                .map_err(summary_err)?;
        }
        writer.flush().map_err(|e| AssemblyError::FileSystem {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub summary: BuildSummary,
    /// Every record written in this run, keyed by molecule id.
    pub entries: BTreeMap<String, MolRecord>,
}

type MoleculeResult = (String, Result<MoleculeOutcome, AssemblyError>);

/// Builds the canonical dataset for every molecule directory under
/// `config.input_dir`.
///
/// Molecules are processed independently. A molecule-level failure is logged
/// and counted in the summary unless `fail_fast` is set. In that case no
/// molecule is started after the first failure, and the first failure (in
/// molecule id order) among the processed molecules is returned.
#[instrument(skip_all, name = "build_workflow")]
pub fn run(config: &AssemblyConfig, reporter: &ProgressReporter) -> Result<BuildResult, AssemblyError> {
    reporter.report(Progress::PhaseStart { name: "Discovery" });
    let molecules = list_molecules(&config.input_dir)?;
    fs::create_dir_all(&config.output_dir).map_err(|e| AssemblyError::FileSystem {
        path: config.output_dir.clone(),
        source: e,
    })?;
    info!(
        count = molecules.len(),
        input = %config.input_dir.display(),
        "Discovered molecule directories."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Assembly" });
    reporter.report(Progress::BatchStart {
        molecules: molecules.len() as u64,
    });

    let mut assembler = DatasetAssembler::new(config);
    let aborted = AtomicBool::new(false);

    #[cfg(not(feature = "parallel"))]
    let iterator = molecules.iter();

    #[cfg(feature = "parallel")]
    let iterator = molecules.par_iter();

    let results: Vec<MoleculeResult> = iterator
        .filter_map(|(mol_id, dir)| {
            if aborted.load(Ordering::Relaxed) {
                return None;
            }
            let result = assembler.process(mol_id, dir);
            let status = match &result {
                Ok(outcome) => outcome.status(),
                Err(_) => {
                    if config.fail_fast {
                        aborted.store(true, Ordering::Relaxed);
                    }
                    MoleculeStatus::Failed.as_str()
                }
            };
            reporter.report(Progress::MoleculeDone {
                mol_id: mol_id.clone(),
                status,
            });
            Some((mol_id.clone(), result))
        })
        .collect();

    reporter.report(Progress::BatchFinish);
    reporter.report(Progress::PhaseFinish);

    let mut summary = BuildSummary::default();
    for (mol_id, result) in results {
        let report = match result {
            Ok(MoleculeOutcome::Written { path, record }) => {
                let report = MoleculeReport {
                    mol_id,
                    status: MoleculeStatus::Written,
                    conformers: record.conformer_count(),
                    detail: path.display().to_string(),
                    error_kind: None,
                };
                assembler.insert(record);
                report
            }
            Ok(MoleculeOutcome::SkippedExisting { path }) => MoleculeReport {
                mol_id,
                status: MoleculeStatus::SkippedExisting,
                conformers: 0,
                detail: path.display().to_string(),
                error_kind: None,
            },
            Ok(MoleculeOutcome::Incomplete { reason }) => MoleculeReport {
                mol_id,
                status: MoleculeStatus::Incomplete,
                conformers: 0,
                detail: reason,
                error_kind: None,
            },
            Err(e) if config.fail_fast => {
                error!(mol_id = %mol_id, "Aborting batch: {}", e);
                reporter.report(Progress::Message(format!("Aborted at {mol_id}: {e}")));
                return Err(e);
            }
            Err(e) => {
                error!(mol_id = %mol_id, "Molecule failed: {}", e);
                reporter.report(Progress::Message(format!("{mol_id} failed: {e}")));
                MoleculeReport {
                    mol_id,
                    status: MoleculeStatus::Failed,
                    conformers: 0,
                    detail: e.to_string(),
                    error_kind: Some(e.kind()),
                }
            }
        };
        summary.record(report);
    }

    if config.write_summary {
        let path = config.output_dir.join(SUMMARY_FILE);
        summary.write_csv(&path)?;
        info!(path = %path.display(), "Wrote build summary.");
    }

    info!(
        total = summary.total,
        written = summary.written,
        skipped = summary.skipped_existing,
        incomplete = summary.incomplete,
        failed = summary.failed,
        conformers = summary.total_conformers,
        "Dataset build finished."
    );

    Ok(BuildResult {
        summary,
        entries: assembler.into_entries(),
    })
}

/// Molecule subdirectories of `input_dir`, sorted by id.
fn list_molecules(input_dir: &Path) -> Result<Vec<(String, PathBuf)>, AssemblyError> {
    let fs_err = |source| AssemblyError::FileSystem {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut molecules = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(fs_err)? {
        let path = entry.map_err(fs_err)?.path();
        if !path.is_dir() {
            continue;
        }
        match path.file_name().and_then(|name| name.to_str()) {
            Some(mol_id) => molecules.push((mol_id.to_string(), path.clone())),
            None => warn!(path = %path.display(), "Skipping directory with a non UTF-8 name."),
        }
    }
    molecules.sort();
    Ok(molecules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::raw::{Addressing, RawBond, RawParameterSet};
    use crate::core::io::formats::{ConformerEntry, ConformerFile, ElementLabel, TopologyFile};
    use crate::core::io::traits::JsonFile;
    use crate::core::models::ids::AtomId;
    use crate::engine::config::AssemblyConfigBuilder;
    use std::sync::Mutex;

    fn hydrogen_molecule(dir: &Path, with_topology: bool, bond_k: f64) {
        fs::create_dir_all(dir).unwrap();
        ConformerFile {
            elements: vec![ElementLabel::Number(1), ElementLabel::Number(1)],
            bonds: Some(vec![[0, 1]]),
            conformers: vec![ConformerEntry {
                positions: vec![[0.0, 0.0, 0.0], [0.74, 0.0, 0.0]],
                energy: Some(-1.17),
                gradient: None,
                forces: Some(vec![[0.1, 0.0, 0.0], [-0.1, 0.0, 0.0]]),
            }],
        }
        .write_to_path(&dir.join("opt.qm.json"))
        .unwrap();

        if with_topology {
            TopologyFile {
                atoms: vec![AtomId(1), AtomId(2)],
                elements: vec![ElementLabel::Number(1), ElementLabel::Number(1)],
                bonds: vec![[AtomId(1), AtomId(2)]],
                partial_charges: None,
                parameters: RawParameterSet {
                    addressing: Addressing::Index,
                    bonds: vec![RawBond::new([1, 0], bond_k, 0.74)],
                    angles: vec![],
                    torsions: vec![],
                },
            }
            .write_to_path(&dir.join("topology.json"))
            .unwrap();
        }
    }

    fn config(input: &Path, output: &Path, fail_fast: bool) -> AssemblyConfig {
        AssemblyConfigBuilder::new()
            .input_dir(input.to_path_buf())
            .output_dir(output.to_path_buf())
            .fail_fast(fail_fast)
            .build()
            .unwrap()
    }

    #[test]
    fn build_counts_every_outcome_and_writes_summary() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        hydrogen_molecule(&input.path().join("h2-a"), true, 350.0);
        hydrogen_molecule(&input.path().join("h2-b"), false, 350.0);
        fs::create_dir(input.path().join("h2-c")).unwrap();
        fs::write(input.path().join("stray.txt"), "not a molecule").unwrap();

        let config = config(input.path(), output.path(), false);
        let done = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::MoleculeDone { mol_id, .. } = event {
                done.lock().unwrap().push(mol_id);
            }
        }));
        let result = run(&config, &reporter).unwrap();
        drop(reporter);

        let summary = &result.summary;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.incomplete, 2);
        assert_eq!(summary.total_conformers, 1);
        assert_eq!(
            result.entries.keys().collect::<Vec<_>>(),
            vec!["h2-a"]
        );
        let mut done = done.into_inner().unwrap();
        done.sort();
        assert_eq!(done, vec!["h2-a", "h2-b", "h2-c"]);

        let csv = fs::read_to_string(output.path().join(SUMMARY_FILE)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("mol_id,outcome,conformers,detail"));
        assert!(lines.next().unwrap().starts_with("h2-a,written,1,"));
        assert_eq!(csv.lines().count(), 4);

        let record = &result.entries["h2-a"];
        let gradient = record.conformers[0].gradient.as_ref().unwrap();
        assert_eq!(gradient[0].x, -0.1);
    }

    #[test]
    fn second_run_skips_existing_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        hydrogen_molecule(&input.path().join("h2"), true, 350.0);

        let config = config(input.path(), output.path(), false);
        let first = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(first.summary.written, 1);

        let second = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(second.summary.skipped_existing, 1);
        assert!(second.entries.is_empty());
    }

    #[test]
    fn failures_are_counted_by_kind_or_abort_with_fail_fast() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        hydrogen_molecule(&input.path().join("good"), true, 350.0);
        let bad = input.path().join("bad");
        hydrogen_molecule(&bad, false, 0.0);
        TopologyFile {
            atoms: vec![AtomId(1), AtomId(2)],
            elements: vec![ElementLabel::Number(1), ElementLabel::Number(1)],
            bonds: vec![[AtomId(1), AtomId(2)]],
            partial_charges: None,
            parameters: RawParameterSet::default(),
        }
        .write_to_path(&bad.join("topology.json"))
        .unwrap();

        let lenient = config(input.path(), output.path(), false);
        let result = run(&lenient, &ProgressReporter::new()).unwrap();
        assert_eq!(result.summary.written, 1);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(result.summary.failures_by_kind.get("malformed-input"), Some(&1));

        let strict = AssemblyConfigBuilder::new()
            .input_dir(input.path().to_path_buf())
            .output_dir(output.path().to_path_buf())
            .fail_fast(true)
            .overwrite(true)
            .build()
            .unwrap();
        let err = run(&strict, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, AssemblyError::Canonicalization { .. }));
    }

    // Single worker, so molecules are visited in id order.
    #[cfg(feature = "parallel")]
    fn run_in_order(
        config: &AssemblyConfig,
        reporter: &ProgressReporter,
    ) -> Result<BuildResult, AssemblyError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| run(config, reporter))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_in_order(
        config: &AssemblyConfig,
        reporter: &ProgressReporter,
    ) -> Result<BuildResult, AssemblyError> {
        run(config, reporter)
    }

    #[test]
    fn fail_fast_starts_no_molecule_after_the_first_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let bad = input.path().join("a-bad");
        hydrogen_molecule(&bad, false, 0.0);
        TopologyFile {
            atoms: vec![AtomId(1), AtomId(2)],
            elements: vec![ElementLabel::Number(1), ElementLabel::Number(1)],
            bonds: vec![[AtomId(1), AtomId(2)]],
            partial_charges: None,
            parameters: RawParameterSet::default(),
        }
        .write_to_path(&bad.join("topology.json"))
        .unwrap();
        for i in 0..4 {
            hydrogen_molecule(&input.path().join(format!("z-good{i}")), true, 350.0);
        }

        let messages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Message(msg) = event {
                messages.lock().unwrap().push(msg);
            }
        }));
        let err = run_in_order(&config(input.path(), output.path(), true), &reporter).unwrap_err();
        drop(reporter);
        assert!(matches!(err, AssemblyError::Canonicalization { .. }));

        let written: Vec<_> = fs::read_dir(output.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(written.is_empty(), "unexpected outputs: {written:?}");
        let messages = messages.into_inner().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Aborted at a-bad"));
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let config = config(&output.path().join("absent"), output.path(), false);
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(AssemblyError::FileSystem { .. })
        ));
    }
}
