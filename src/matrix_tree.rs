//! Spanning-tree marginals via the Matrix-Tree Theorem, in the log domain.
//!
//! A weighted directed graph over `n` nodes is given by per-edge log-weights
//! `adj[h*n + m]` (head `h` → modifier `m`; the diagonal is meaningless and
//! ignored) and per-root log-weights `root[i]`. The Gibbs distribution over
//! rooted spanning trees (arborescences) scores a tree \((\rho, E)\) as
//! \[
//! s(\rho, E) = r_\rho + \sum_{(h,m) \in E} A_{hm}.
//! \]
//!
//! The **log-partition function** is \(\ln Z = \log \sum_{(\rho,E)} e^{s(\rho,E)}\),
//! and its gradients are marginal probabilities:
//! \[
//! \frac{\partial \ln Z}{\partial r_i} = \mathbb{P}(\text{root} = i), \qquad
//! \frac{\partial \ln Z}{\partial A_{hm}} = \mathbb{P}((h,m) \in E).
//! \]
//!
//! Both come in closed form from a single LU factorization of the
//! root-augmented Laplacian, which is the point of this module: one
//! \(O(n^3)\) factorization replaces a sum over \(n^{n-1}\) trees.
//!
//! References:
//! - Koo, Globerson, Carreras & Collins (EMNLP'07), *Structured Prediction
//!   Models via the Matrix-Tree Theorem*.
//! - Smith & Smith (EMNLP'07), *Probabilistic Models of Nonprojective
//!   Dependency Trees*.
//! - McDonald & Satta (IWPT'07).

use nalgebra::DMatrix;

/// Errors for spanning-tree marginal inference.
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
    /// The root-augmented Laplacian is numerically singular, so the
    /// distribution over trees is degenerate (or the weights are so skewed
    /// that every pivot underflowed). The caller owns input conditioning.
    #[error("root-augmented Laplacian is singular for n={n}")]
    SingularLaplacian {
        /// Number of nodes in the graph.
        n: usize,
    },
    /// The Laplacian inverted, but the inverse carries non-finite entries.
    #[error("Laplacian inverse has non-finite entries for n={n}")]
    NonFiniteMarginals {
        /// Number of nodes in the graph.
        n: usize,
    },
}

/// Convenience result type for this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Log-partition function and marginal probabilities of a spanning-tree
/// distribution.
///
/// This is the gradient pair a downstream parser consumes: `root` and `edge`
/// are \(\nabla_r \ln Z\) and \(\nabla_A \ln Z\) respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeMarginals {
    /// Log-partition function \(\ln Z\) of the distribution over rooted trees.
    pub log_partition: f64,
    /// `root[i]` = probability that node `i` is the root. Length `n`, sums to 1.
    pub root: Vec<f64>,
    /// `edge[h*n + m]` = probability that edge `(h, m)` is in the tree.
    /// Row-major `n*n`; the diagonal is 0 (no self-loop edges exist).
    pub edge: Vec<f64>,
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
            // The diagonal is semantically irrelevant, so it is exempt.
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

/// Largest log-weight among the root weights and off-diagonal adjacency.
///
/// Everything is shifted down by this before exponentiating, so no entry of
/// the Laplacian exceeds 1 and the determinant cannot overflow. The shift
/// cancels exactly: `log(det(e^c · M)) = c·n + log(det(M))`.
fn stabilization_shift(adj: &[f64], root: &[f64], n: usize) -> f64 {
    let mut c = f64::NEG_INFINITY;
    for &w in root {
        c = c.max(w);
    }
    for h in 0..n {
        for m in 0..n {
            if h != m {
                c = c.max(adj[h * n + m]);
            }
        }
    }
    c
}

/// Compute the log-partition function of the spanning-tree distribution and
/// its gradients (the root and edge marginals) in closed form.
///
/// `adj` is the row-major `n×n` table of edge log-weights (`adj[h*n + m]` for
/// head `h` → modifier `m`; diagonal entries are ignored) and `root` the
/// length-`n` table of root log-weights. One LU factorization of the
/// root-augmented Laplacian yields everything, so the call is \(O(n^3)\) and
/// safe on large graphs, unlike the exhaustive oracle in
/// [`crate::arborescence`].
///
/// Degenerate weight configurations (e.g. a node unreachable under any
/// finite-weight tree) surface as [`Error::SingularLaplacian`] or
/// [`Error::NonFiniteMarginals`]; they are never masked. The function is
/// referentially transparent: identical inputs give bit-identical outputs.
pub fn spanning_tree_marginals(adj: &[f64], root: &[f64], n: usize) -> Result<TreeMarginals> {
    validate(adj, root, n)?;

    let c = stabilization_shift(adj, root, n);
    let rp: Vec<f64> = root.iter().map(|&w| (w - c).exp()).collect();
    let mut ap = DMatrix::<f64>::zeros(n, n);
    for h in 0..n {
        for m in 0..n {
            if h != m {
                ap[(h, m)] = (adj[h * n + m] - c).exp();
            }
        }
    }

    // Weighted Laplacian over the exponentiated weights: the diagonal holds
    // each modifier's total incoming weight, off-diagonals the negated edge
    // weights. Row 0 is then overwritten with the root weights, Koo et al.'s
    // device that folds the root choice into the same determinant.
    let mut lap = DMatrix::<f64>::zeros(n, n);
    for m in 0..n {
        lap[(m, m)] = ap.column(m).sum();
        for h in 0..n {
            if h != m {
                lap[(h, m)] = -ap[(h, m)];
            }
        }
    }
    for m in 0..n {
        lap[(0, m)] = rp[m];
    }

    let lu = lap.lu();

    // log|det L| straight off the diagonal of U; the permutation only flips
    // the sign, which the absolute value discards.
    let u = lu.u();
    let mut log_abs_det = 0.0;
    for i in 0..n {
        let pivot = u[(i, i)].abs();
        if pivot == 0.0 {
            return Err(Error::SingularLaplacian { n });
        }
        log_abs_det += pivot.ln();
    }
    let log_partition = log_abs_det + c * n as f64;
    if !log_partition.is_finite() {
        return Err(Error::SingularLaplacian { n });
    }

    let inv = lu.try_inverse().ok_or(Error::SingularLaplacian { n })?;
    if inv.iter().any(|x| !x.is_finite()) {
        return Err(Error::NonFiniteMarginals { n });
    }

    // ∂lnZ/∂L = L⁻ᵀ, chained through the exponentiated weights. Row 0 of L
    // holds the root weights, so (L⁻ᵀ)[0, i] is the root-marginal factor and
    // the usual Laplacian terms drop out wherever that row is involved; hence
    // the `!= 0` guards below. The formulas assume the distinguished row is
    // exactly 0.
    let mut root_marg = vec![0.0; n];
    for (i, r) in root_marg.iter_mut().enumerate() {
        *r = rp[i] * inv[(i, 0)];
    }

    let mut edge_marg = vec![0.0; n * n];
    for h in 0..n {
        for m in 0..n {
            if h == m {
                continue;
            }
            let diag = if m != 0 { inv[(m, m)] } else { 0.0 };
            let off = if h != 0 { inv[(m, h)] } else { 0.0 };
            edge_marg[h * n + m] = ap[(h, m)] * (diag - off);
        }
    }

    Ok(TreeMarginals {
        log_partition,
        root: root_marg,
        edge: edge_marg,
    })
}
