//! Exhaustive enumeration of rooted spanning trees of the complete graph.
//!
//! This module is the ground-truth oracle for [`crate::matrix_tree`]: it walks
//! every arborescence of the complete directed graph on `n` labeled nodes,
//! scores each one directly, and normalizes by brute force. Cayley's formula
//! puts the number of rooted trees at \(n^{n-1}\), so everything here is
//! exponential in `n` and strictly a small-`n` validation tool (practical
//! ceiling around n ≈ 10), never a production path. Memory stays O(n) per
//! enumeration step; only time blows up.
//!
//! Cycle detection is delegated to petgraph's topological sort, which is the
//! one piece of generic graph machinery this crate does not own.

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::matrix_tree::TreeMarginals;

/// Errors for the brute-force oracle.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Graph must have at least one node.
    #[error("graph must have at least 1 node, got {0}")]
    EmptyGraph(usize),
    /// Adjacency slice length does not match `n * n`.
    #[error("adjacency has length {len}, expected {n}*{n}={expected}")]
    InvalidAdjacencyShape {
        /// The provided `adj` slice length.
        len: usize,
        /// Number of nodes in the graph.
        n: usize,
        /// `n*n`, included explicitly for readability.
        expected: usize,
    },
    /// Root-weight slice length does not match `n`.
    #[error("root weights have length {len}, expected {n}")]
    InvalidRootShape {
        /// The provided `root` slice length.
        len: usize,
        /// Number of nodes in the graph.
        n: usize,
    },
    /// Off-diagonal adjacency log-weights must be finite.
    #[error("adjacency log-weight ({h}->{m}) is {value}, expected finite")]
    NonFiniteAdjacency {
        /// Head endpoint of the offending entry.
        h: usize,
        /// Modifier endpoint of the offending entry.
        m: usize,
        /// The non-finite value.
        value: f64,
    },
    /// Root log-weights must be finite.
    #[error("root log-weight for node {i} is {value}, expected finite")]
    NonFiniteRoot {
        /// The offending node.
        i: usize,
        /// The non-finite value.
        value: f64,
    },
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// A rooted spanning tree over nodes `0..n`: a root plus `n - 1` directed
/// (head, modifier) edges in which every non-root node has exactly one head
/// and the root has none.
///
/// Edges are stored sorted by modifier, so structurally equal trees compare
/// equal and hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootedTree {
    /// The root node; it has no incoming edge.
    pub root: usize,
    /// Directed (head, modifier) pairs.
    pub edges: Vec<(usize, usize)>,
}

impl RootedTree {
    /// Unnormalized log-score `root[ρ] + Σ adj[h*n + m]` of this tree under
    /// the given weight tables (`adj` row-major `n×n`, `root` length `n`).
    pub fn score(&self, adj: &[f64], root: &[f64], n: usize) -> f64 {
        let mut s = root[self.root];
        for &(h, m) in &self.edges {
            debug_assert_ne!(m, self.root, "the root cannot be a modifier");
            s += adj[h * n + m];
        }
        s
    }
}

/// Arborescence predicate over a directed edge list on nodes `0..n`.
///
/// True iff the list has exactly `n - 1` in-range, non-self-loop edges, no
/// node has two heads, and the edges admit a topological order. Under those
/// degree constraints acyclicity is exactly what separates a tree from a
/// parent assignment with an off-root cycle.
pub fn is_arborescence(n: usize, edges: &[(usize, usize)]) -> bool {
    if n == 0 || edges.len() != n - 1 {
        return false;
    }
    let mut heads = vec![0u8; n];
    for &(h, m) in edges {
        if h >= n || m >= n || h == m {
            return false;
        }
        heads[m] += 1;
        if heads[m] > 1 {
            return false;
        }
    }
    let graph = DiGraph::<(), ()>::from_edges(edges.iter().map(|&(h, m)| (h as u32, m as u32)));
    toposort(&graph, None).is_ok()
}

/// Lazily enumerate every rooted spanning tree of the complete directed graph
/// on `n` labeled nodes, each exactly once.
///
/// Proposal strategy: for each candidate root, every other node independently
/// picks a head among the `n - 1` nodes other than itself (the root's slot is
/// pinned to "no head"), and a proposal is kept iff [`is_arborescence`]
/// accepts it. That is \(n (n-1)^{n-1}\) proposals filtered down to
/// \(n^{n-1}\) trees; on exhaustion the iterator checks both counts against
/// those closed forms and panics on a mismatch, since a disagreement can only
/// be a bug in the generator or the predicate.
///
/// Each call returns a fresh iterator with no shared state, so enumerations
/// are restartable and may run in parallel.
pub fn arborescences(n: usize) -> Arborescences {
    Arborescences {
        n,
        root: 0,
        digits: vec![0; n],
        exhausted: n == 0,
        proposals: 0,
        accepts: 0,
    }
}

/// Iterator over all rooted spanning trees of the complete graph, produced by
/// [`arborescences`].
#[derive(Debug, Clone)]
pub struct Arborescences {
    n: usize,
    root: usize,
    digits: Vec<usize>,
    exhausted: bool,
    proposals: u128,
    accepts: u128,
}

impl Arborescences {
    /// Head currently encoded by node `j`'s odometer digit. Digits index the
    /// candidate set `0..n` minus `j` itself.
    fn head_of(&self, j: usize) -> usize {
        let d = self.digits[j];
        if d < j {
            d
        } else {
            d + 1
        }
    }

    /// Mixed-radix odometer step over per-node head choices; rolls over to
    /// the next root when every digit wraps.
    fn step(&mut self) {
        for j in (0..self.n).rev() {
            if j == self.root {
                continue;
            }
            self.digits[j] += 1;
            if self.digits[j] < self.n - 1 {
                return;
            }
            self.digits[j] = 0;
        }
        self.root += 1;
        if self.root >= self.n {
            self.exhausted = true;
        }
    }

    /// Exhaustion-time self-check against the closed-form counts.
    fn check_counts(&self) {
        if self.n == 0 {
            return;
        }
        let n = self.n as u128;
        let expected_proposals = n * (n - 1).pow(self.n as u32 - 1);
        let expected_accepts = n.pow(self.n as u32 - 1);
        assert_eq!(
            self.proposals, expected_proposals,
            "arborescence generator made {} proposals over n={} nodes, expected n*(n-1)^(n-1) = {}",
            self.proposals, self.n, expected_proposals
        );
        assert_eq!(
            self.accepts, expected_accepts,
            "arborescence generator accepted {} trees over n={} nodes, expected Cayley count n^(n-1) = {}",
            self.accepts, self.n, expected_accepts
        );
    }
}

impl Iterator for Arborescences {
    type Item = RootedTree;

    fn next(&mut self) -> Option<RootedTree> {
        while !self.exhausted {
            let root = self.root;
            let edges: Vec<(usize, usize)> = (0..self.n)
                .filter(|&m| m != root)
                .map(|m| (self.head_of(m), m))
                .collect();
            self.proposals += 1;
            self.step();
            if is_arborescence(self.n, &edges) {
                self.accepts += 1;
                return Some(RootedTree { root, edges });
            }
        }
        self.check_counts();
        None
    }
}

/// Exact log-partition function and marginals by direct enumeration.
///
/// Scores every rooted spanning tree of the complete graph on `n` nodes and
/// normalizes with a streaming log-sum-exp: one pass over the enumeration
/// finds the maximum score, a second accumulates shifted exponentials and the
/// unnormalized marginal sums. This is the reference the closed-form engine
/// ([`crate::matrix_tree::spanning_tree_marginals`]) is validated against;
/// it is exponential in `n` and never used where performance matters.
pub fn brute_force_marginals(adj: &[f64], root: &[f64], n: usize) -> Result<TreeMarginals> {
    validate(adj, root, n)?;

    let mut max_score = f64::NEG_INFINITY;
    for tree in arborescences(n) {
        max_score = max_score.max(tree.score(adj, root, n));
    }

    let mut total = 0.0;
    let mut root_marg = vec![0.0; n];
    let mut edge_marg = vec![0.0; n * n];
    for tree in arborescences(n) {
        let w = (tree.score(adj, root, n) - max_score).exp();
        total += w;
        root_marg[tree.root] += w;
        for &(h, m) in &tree.edges {
            edge_marg[h * n + m] += w;
        }
    }

    let log_partition = max_score + total.ln();
    for p in &mut root_marg {
        *p /= total;
    }
    for p in &mut edge_marg {
        *p /= total;
    }

    Ok(TreeMarginals {
        log_partition,
        root: root_marg,
        edge: edge_marg,
    })
}

fn validate(adj: &[f64], root: &[f64], n: usize) -> Result<()> {
    if n == 0 {
        return Err(Error::EmptyGraph(n));
    }
    if adj.len() != n * n {
        return Err(Error::InvalidAdjacencyShape {
            len: adj.len(),
            n,
            expected: n * n,
        });
    }
    if root.len() != n {
        return Err(Error::InvalidRootShape { len: root.len(), n });
    }
    for h in 0..n {
        for m in 0..n {
            if h != m && !adj[h * n + m].is_finite() {
                return Err(Error::NonFiniteAdjacency {
                    h,
                    m,
                    value: adj[h * n + m],
                });
            }
        }
    }
    for (i, &w) in root.iter().enumerate() {
        if !w.is_finite() {
            return Err(Error::NonFiniteRoot { i, value: w });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn counts_match_cayley_for_small_graphs() {
        for n in 1..=6usize {
            // Collecting drives the iterator to exhaustion, which also runs
            // its internal proposal/accept self-check.
            let trees: Vec<RootedTree> = arborescences(n).collect();
            assert_eq!(trees.len(), n.pow(n as u32 - 1), "n={}", n);
            let unique: HashSet<&RootedTree> = trees.iter().collect();
            assert_eq!(unique.len(), trees.len(), "duplicate trees for n={}", n);
        }
    }

    #[test]
    fn two_node_enumeration_is_exact() {
        let trees: Vec<RootedTree> = arborescences(2).collect();
        assert_eq!(
            trees,
            vec![
                RootedTree {
                    root: 0,
                    edges: vec![(0, 1)]
                },
                RootedTree {
                    root: 1,
                    edges: vec![(1, 0)]
                },
            ]
        );
    }

    #[test]
    fn every_tree_is_a_valid_arborescence() {
        for tree in arborescences(4) {
            assert!(is_arborescence(4, &tree.edges), "{:?}", tree);
            assert!(tree.edges.iter().all(|&(_, m)| m != tree.root));
        }
    }

    #[test]
    fn enumeration_is_restartable() {
        let first: Vec<RootedTree> = arborescences(3).collect();
        let second: Vec<RootedTree> = arborescences(3).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn recognizes_arborescences() {
        assert!(!is_arborescence(0, &[]));
        assert!(is_arborescence(1, &[]));
        assert!(is_arborescence(3, &[(0, 1), (1, 2)])); // chain
        assert!(is_arborescence(3, &[(0, 1), (0, 2)])); // star
        assert!(!is_arborescence(3, &[(1, 2), (2, 1)])); // cycle off the root
        assert!(!is_arborescence(3, &[(0, 1)])); // too few edges
        assert!(!is_arborescence(4, &[(0, 1), (0, 2), (1, 2)])); // two heads
        assert!(!is_arborescence(2, &[(1, 1)])); // self-loop
        assert!(!is_arborescence(2, &[(0, 2)])); // endpoint out of range
    }

    #[test]
    fn two_node_brute_force_matches_closed_form() {
        let (a, b) = (0.9, -0.6);
        let (r0, r1) = (-0.2, 0.8);
        let marg = brute_force_marginals(&[0.0, a, b, 0.0], &[r0, r1], 2).unwrap();

        let s0 = r0 + a;
        let s1 = r1 + b;
        let hi = s0.max(s1);
        let lnz = hi + ((s0 - hi).exp() + (s1 - hi).exp()).ln();
        assert!((marg.log_partition - lnz).abs() < 1e-12);

        let sigmoid = 1.0 / (1.0 + (-(s0 - s1)).exp());
        assert!((marg.root[0] - sigmoid).abs() < 1e-12);
        assert!((marg.root[0] + marg.root[1] - 1.0).abs() < 1e-12);
        assert!((marg.edge[1] - marg.root[0]).abs() < 1e-12);
        assert!((marg.edge[2] - marg.root[1]).abs() < 1e-12);
    }

    #[test]
    fn brute_force_marginals_are_normalized() {
        let n = 3;
        let adj = [0.0, 0.4, -0.7, 1.2, 0.0, 0.3, -0.5, 0.8, 0.0];
        let root = [0.6, -0.1, 0.2];
        let marg = brute_force_marginals(&adj, &root, n).unwrap();

        let total: f64 = marg.root.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        for m in 0..n {
            let incoming: f64 = (0..n).map(|h| marg.edge[h * n + m]).sum();
            assert!(
                (marg.root[m] + incoming - 1.0).abs() < 1e-12,
                "node {}: {} + {}",
                m,
                marg.root[m],
                incoming
            );
        }
    }

    #[test]
    fn rejects_malformed_shapes() {
        assert_eq!(
            brute_force_marginals(&[], &[], 0),
            Err(Error::EmptyGraph(0))
        );
        assert_eq!(
            brute_force_marginals(&[0.0; 2], &[0.0; 2], 2),
            Err(Error::InvalidAdjacencyShape {
                len: 2,
                n: 2,
                expected: 4
            })
        );
        assert_eq!(
            brute_force_marginals(&[0.0; 4], &[0.0; 1], 2),
            Err(Error::InvalidRootShape { len: 1, n: 2 })
        );
        assert!(matches!(
            brute_force_marginals(&[0.0, f64::NEG_INFINITY, 0.0, 0.0], &[0.0; 2], 2),
            Err(Error::NonFiniteAdjacency { h: 0, m: 1, .. })
        ));
    }
}
