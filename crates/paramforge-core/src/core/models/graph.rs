use petgraph::graph::{NodeIndex, UnGraph};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("Edge ({i}, {j}) references an atom outside the graph of {n_atoms} atoms")]
    EdgeOutOfBounds { i: usize, j: usize, n_atoms: usize },
    #[error("Atom {0} cannot be bonded to itself")]
    SelfLoop(usize),
}

/// A labeled molecular graph over positional atom indices.
///
/// Node labels are atomic numbers. Edges are stored once, normalized so that
/// the smaller index comes first, and kept sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MolecularGraph {
    labels: Vec<u8>,
    edges: Vec<(usize, usize)>,
}

impl MolecularGraph {
    pub fn new(labels: Vec<u8>, edges: &[(usize, usize)]) -> Result<Self, GraphError> {
        let n_atoms = labels.len();
        let mut normalized = Vec::with_capacity(edges.len());
        for &(i, j) in edges {
            if i >= n_atoms || j >= n_atoms {
                return Err(GraphError::EdgeOutOfBounds { i, j, n_atoms });
            }
            if i == j {
                return Err(GraphError::SelfLoop(i));
            }
            normalized.push((i.min(j), i.max(j)));
        }
        normalized.sort_unstable();
        normalized.dedup();
        Ok(Self {
            labels,
            edges: normalized,
        })
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Cheap necessary condition for two graphs to be isomorphic: equal
    /// node and edge counts and equal label multisets.
    pub fn is_compatible_with(&self, other: &MolecularGraph) -> bool {
        if self.node_count() != other.node_count() || self.edge_count() != other.edge_count() {
            return false;
        }
        let mut a = self.labels.clone();
        let mut b = other.labels.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    /// Returns the graph with atoms reordered so that new atom `i` is old atom
    /// `permutation[i]`.
    pub fn permuted(&self, permutation: &[usize]) -> Self {
        let mut inverse = vec![0; permutation.len()];
        for (new, &old) in permutation.iter().enumerate() {
            inverse[old] = new;
        }
        let labels = permutation.iter().map(|&old| self.labels[old]).collect();
        let mut edges: Vec<_> = self
            .edges
            .iter()
            .map(|&(i, j)| {
                let (a, b) = (inverse[i], inverse[j]);
                (a.min(b), a.max(b))
            })
            .collect();
        edges.sort_unstable();
        Self { labels, edges }
    }

    pub fn to_ungraph(&self) -> UnGraph<u8, ()> {
        let mut graph = UnGraph::<u8, ()>::with_capacity(self.labels.len(), self.edges.len());
        for &label in &self.labels {
            graph.add_node(label);
        }
        for &(i, j) in &self.edges {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
        }
        graph
    }
}

/// Reorders `data` so that entry `i` of the result is `data[permutation[i]]`.
pub fn apply_permutation<T: Clone>(data: &[T], permutation: &[usize]) -> Vec<T> {
    permutation.iter().map(|&i| data[i].clone()).collect()
}

/// Checks that `permutation` is a bijection on `0..n`.
pub fn is_permutation(permutation: &[usize], n: usize) -> bool {
    if permutation.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in permutation {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
