//! Python binding layer for subset support recalculation.
//!
//! Provides Python functions to prune Newick trees and to recalculate
//! bootstrap support for a subset of taxa.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::BTreeSet;

use crate::error::Error;
use crate::io::{read_reference_tree, read_replicate_file};
use crate::newick::{parse, to_newick, to_newick_with, NewickFormat};
use crate::prune::{prune, BranchLengths};
use crate::recalculate::recalculate_for_subset;
use crate::selection::TaxonSelector;

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Prune a tree to a subset of taxa and recalculate its bootstrap support.
///
/// Args:
///     tree: Path to a Newick file, or a Newick string
///     bootstrap_trees: Path to the file with one bootstrap tree per line (.gz allowed)
///     taxa: Regular expression selecting the taxa to keep (matched at the start)
///     support_decimals: Round support values to this many decimals (default: None)
///
/// Returns:
///     The pruned tree with recalculated support, as a Newick string
///
/// Raises:
///     ValueError: On unreadable or malformed trees, mismatched taxa or an invalid pattern
#[pyfunction]
#[pyo3(signature = (tree, bootstrap_trees, taxa, support_decimals=None))]
fn recalculate_support(
    tree: String,
    bootstrap_trees: String,
    taxa: String,
    support_decimals: Option<usize>,
) -> PyResult<String> {
    let selector = TaxonSelector::new(&taxa).map_err(to_py_err)?;
    let reference = read_reference_tree(&tree).map_err(to_py_err)?;
    let selected = selector.select(reference.leaf_names().iter().map(String::as_str));
    let replicates = read_replicate_file(&bootstrap_trees).map_err(to_py_err)?;

    let result = recalculate_for_subset(reference, replicates, &selected).map_err(to_py_err)?;
    Ok(to_newick_with(&result.tree, &NewickFormat { support_decimals }))
}

/// Prune a Newick tree to the given taxa.
///
/// Args:
///     newick: The tree as a Newick string
///     keep: Names of the leaves to keep
///     preserve_branch_length: Add lengths of removed nodes to their child (default: True)
///
/// Returns:
///     The pruned tree as a Newick string
#[pyfunction]
#[pyo3(signature = (newick, keep, preserve_branch_length=true))]
fn prune_newick(
    newick: String,
    keep: Vec<String>,
    preserve_branch_length: bool,
) -> PyResult<String> {
    let mut tree = parse(&newick).map_err(to_py_err)?;
    let keep: BTreeSet<String> = keep.into_iter().collect();
    let lengths = if preserve_branch_length {
        BranchLengths::Preserve
    } else {
        BranchLengths::Discard
    };
    prune(&mut tree, &keep, lengths).map_err(to_py_err)?;
    Ok(to_newick(&tree))
}

/// Python module definition
#[pymodule]
fn rust_python_subset_support(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(recalculate_support, m)?)?;
    m.add_function(wrap_pyfunction!(prune_newick, m)?)?;
    Ok(())
}
