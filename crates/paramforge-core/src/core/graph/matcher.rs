use crate::core::models::graph::{MolecularGraph, is_permutation};
use petgraph::algo::subgraph_isomorphisms_iter;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_MAX_MAPPINGS: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MatchError {
    #[error("No graphs were supplied for matching")]
    Empty,
    #[error("Source {candidate} is not isomorphic to the reference graph")]
    NoIsomorphism { candidate: usize },
}

/// Source of atom-index bijections between two labeled graphs.
///
/// Each returned mapping `p` satisfies: reference atom `i` corresponds to
/// candidate atom `p[i]`.
pub trait IsomorphismOracle: Sync {
    fn isomorphisms(&self, reference: &MolecularGraph, candidate: &MolecularGraph)
    -> Vec<Vec<usize>>;
}

/// VF2 isomorphism search backed by `petgraph`.
#[derive(Debug, Clone, Copy)]
pub struct Vf2Oracle {
    max_mappings: usize,
}

impl Vf2Oracle {
    pub fn new(max_mappings: usize) -> Self {
        Self {
            max_mappings: max_mappings.max(1),
        }
    }
}

impl Default for Vf2Oracle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MAPPINGS)
    }
}

impl IsomorphismOracle for Vf2Oracle {
    fn isomorphisms(
        &self,
        reference: &MolecularGraph,
        candidate: &MolecularGraph,
    ) -> Vec<Vec<usize>> {
        if !reference.is_compatible_with(candidate) {
            return Vec::new();
        }
        let g0 = reference.to_ungraph();
        let g1 = candidate.to_ungraph();
        let (g0_ref, g1_ref) = (&g0, &g1);
        let mut node_match = |a: &u8, b: &u8| a == b;
        let mut edge_match = |_: &(), _: &()| true;

        // With equal node and edge counts every subgraph isomorphism is a
        // full isomorphism.
        subgraph_isomorphisms_iter(&g0_ref, &g1_ref, &mut node_match, &mut edge_match)
            .map(|mappings| mappings.take(self.max_mappings).collect())
            .unwrap_or_default()
    }
}

/// Result of aligning a set of graphs onto the first one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alignment {
    /// Permutation per successfully matched source index.
    pub permutations: BTreeMap<usize, Vec<usize>>,
    pub failures: Vec<MatchError>,
}

impl Alignment {
    pub fn is_matched(&self, source: usize) -> bool {
        self.permutations.contains_key(&source)
    }
}

/// Aligns atom orderings of graphs that describe the same molecule.
#[derive(Debug, Clone, Default)]
pub struct GraphIsomorphismMatcher<O = Vf2Oracle> {
    oracle: O,
}

impl<O: IsomorphismOracle> GraphIsomorphismMatcher<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    /// Computes the permutation taking `candidate` into `reference`'s atom order.
    ///
    /// When the molecule is symmetric and several mappings exist, the
    /// lexicographically smallest permutation is returned so that repeated
    /// runs agree.
    pub fn match_pair(
        &self,
        reference: &MolecularGraph,
        candidate: &MolecularGraph,
        candidate_index: usize,
    ) -> Result<Vec<usize>, MatchError> {
        let n = reference.node_count();
        let mappings: Vec<Vec<usize>> = self
            .oracle
            .isomorphisms(reference, candidate)
            .into_iter()
            .filter(|p| is_permutation(p, n) && preserves_structure(reference, candidate, p))
            .collect();

        if mappings.len() > 1 {
            debug!(
                candidate = candidate_index,
                count = mappings.len(),
                "Graph has several isomorphisms; choosing the lexicographically smallest."
            );
        }
        mappings
            .into_iter()
            .min()
            .ok_or(MatchError::NoIsomorphism {
                candidate: candidate_index,
            })
    }

    /// Aligns every graph onto `graphs[0]`.
    ///
    /// The first graph always receives the identity permutation. Sources that
    /// cannot be matched are reported in [`Alignment::failures`] and left out
    /// of [`Alignment::permutations`]; the remaining sources are still aligned.
    pub fn align(&self, graphs: &[MolecularGraph]) -> Result<Alignment, MatchError> {
        let reference = graphs.first().ok_or(MatchError::Empty)?;
        let mut alignment = Alignment::default();
        alignment
            .permutations
            .insert(0, (0..reference.node_count()).collect());

        for (index, candidate) in graphs.iter().enumerate().skip(1) {
            match self.match_pair(reference, candidate, index) {
                Ok(permutation) => {
                    alignment.permutations.insert(index, permutation);
                }
                Err(e) => {
                    warn!("Could not match source {} to the reference graph: {}", index, e);
                    alignment.failures.push(e);
                }
            }
        }
        Ok(alignment)
    }
}

fn preserves_structure(
    reference: &MolecularGraph,
    candidate: &MolecularGraph,
    permutation: &[usize],
) -> bool {
    reference.is_compatible_with(candidate) && candidate.permuted(permutation) == *reference
}
