//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: arena-based rooted tree (traversals, leaf lookup, LCA).
//! - `newick`: Newick parsing and serialization.
//! - `prune`: reduce a tree to a leaf subset.
//! - `bitset`: compact bitset representation of clades.
//! - `snapshot`: per-node clade bitsets over a shared leaf index.
//! - `support`: bootstrap support recalculation.
//! - `selection`: regex taxon selection.
//! - `recalculate`: validation + pruning + support for a taxon subset.
//! - `io`: reading reference/bootstrap files, writing the result.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod error;
pub mod io;
pub mod newick;
pub mod prune;
pub mod recalculate;
pub mod selection;
pub mod snapshot;
pub mod support;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::{Error, Result};
pub use newick::{parse, to_newick, to_newick_with, NewickFormat};
pub use prune::{prune, BranchLengths};
pub use recalculate::{recalculate_for_subset, Recalculation};
pub use selection::TaxonSelector;
pub use support::recompute_support;
pub use tree::{Node, NodeId, Tree};
