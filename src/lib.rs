//! Differentiable inference over spanning-tree distributions.
//!
//! This crate holds the computational core of non-projective dependency
//! parsing: the probability distribution over rooted spanning trees
//! (arborescences) induced by per-edge and per-root log-weights, its
//! log-partition function, and the gradients of that log-partition function,
//! which are exactly the root and edge marginal probabilities.
//!
//! Public invariants (must not change):
//! - APIs are backend-agnostic (slice-based, `Vec<f64>` outputs).
//! - Numeric code is deterministic (no RNG in core ops).
//! - [`matrix_tree`] is the polynomial production path; [`arborescence`] is an
//!   exponential exhaustive oracle, for small-`n` validation only.

pub mod arborescence;
pub mod matrix_tree;

/// Re-export the closed-form engine at crate root for downstream parsers.
pub use matrix_tree::*;
