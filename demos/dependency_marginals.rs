//! Marginal inference over dependency arcs for a toy sentence.
//!
//! The edge marginals of the spanning-tree distribution are exactly the
//! gradients of the log-partition function w.r.t. the arc log-weights: the
//! "soft attention" a probabilistic parser puts on each candidate
//! head-modifier arc, with the root marginals covering the choice of
//! sentence head.

use spanop::matrix_tree::spanning_tree_marginals;

fn main() {
    let words = ["flies", "like", "honey"];
    let n = words.len();

    // adj[h*n + m]: log-weight for the arc head h -> modifier m.
    let adj = [
        0.0, 1.2, 0.3, //
        0.4, 0.0, 1.5, //
        -0.6, 0.1, 0.0,
    ];
    let root = [1.0, -0.2, -0.8];

    let marg = spanning_tree_marginals(&adj, &root, n).unwrap();

    println!("log-partition = {:.6}", marg.log_partition);
    for (i, word) in words.iter().enumerate() {
        println!("p(root = {word}) = {:.4}", marg.root[i]);
    }
    for h in 0..n {
        for m in 0..n {
            if h == m {
                continue;
            }
            println!(
                "p({} -> {}) = {:.4}",
                words[h],
                words[m],
                marg.edge[h * n + m]
            );
        }
    }
}
