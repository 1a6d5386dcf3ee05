//! Bootstrap support recalculation.
//!
//! For every internal node N of the reference, with clade S (the leaves below
//! N), a replicate R supports N when the lowest common ancestor of S in R has
//! exactly S below it. The support of N is the percentage of supporting
//! replicates.
//!
//! # Example
//! ```text
//! reference:  ((A,B),(C,D))     clade {A,B}
//! replicate 1: ((A,B),(C,D))    LCA(A,B) = (A,B)          → {A,B}      match
//! replicate 2: ((A,C),(B,D))    LCA(A,B) = root           → {A,B,C,D}  no match
//! support {A,B} = 1 / 2 * 100 = 50
//! ```
//!
//! Clades are compared as bitsets over a [`LeafIndex`] shared by all trees,
//! and every tree is snapshotted once, so each check costs one LCA walk plus
//! one bitset comparison.

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::snapshot::{CladeSnapshot, LeafIndex};
use crate::tree::{NodeId, Tree};
use rayon::prelude::*;

/// Support of one internal node before and after recalculation.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportChange {
    pub node: NodeId,
    pub previous: Option<f64>,
    pub support: f64,
}

/// Replace the support of every internal node of `reference` by the
/// percentage of `replicates` that contain the node's clade.
///
/// All replicates must have exactly the leaf set of `reference`; this is
/// re-checked here.
///
/// Returns the changes in level order, root first.
///
/// # Errors
/// - `InvalidInput` if `replicates` is empty
/// - `Replicate { index, .. }` wrapping an `InvariantViolation` when a replicate
///   has a different leaf set
pub fn recompute_support(reference: &mut Tree, replicates: &[Tree]) -> Result<Vec<SupportChange>> {
    if replicates.is_empty() {
        return Err(Error::InvalidInput(
            "no bootstrap trees to compute support from".into(),
        ));
    }

    let index = LeafIndex::from_tree(reference)?;
    let reference_snapshot = CladeSnapshot::from_tree(reference, &index)?;
    let replicate_snapshots: Vec<CladeSnapshot> = replicates
        .par_iter()
        .enumerate()
        .map(|(i, tree)| CladeSnapshot::from_tree(tree, &index).map_err(|e| e.in_replicate(i)))
        .collect::<Result<Vec<_>>>()?;

    let internal = reference.internal_nodes();
    let total = replicates.len() as f64;

    // One counter per node, nothing shared between workers
    let matches: Vec<(NodeId, usize)> = internal
        .par_iter()
        .map(|&node| -> Result<(NodeId, usize)> {
            let clade = reference_snapshot.clade(&node)?;
            let mut count = 0;
            for (i, (tree, snapshot)) in replicates.iter().zip(&replicate_snapshots).enumerate() {
                if clade_is_reproduced(clade, tree, snapshot).map_err(|e| e.in_replicate(i))? {
                    count += 1;
                }
            }
            Ok((node, count))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut changes = Vec::with_capacity(matches.len());
    for (node, count) in matches {
        let support = count as f64 / total * 100.0;
        let target = reference.get_mut(&node)?;
        changes.push(SupportChange {
            node,
            previous: target.support.replace(support),
            support,
        });
    }
    Ok(changes)
}

/// Whether the LCA of `clade`'s leaves in `tree` spans exactly `clade`.
fn clade_is_reproduced(clade: &Bitset, tree: &Tree, snapshot: &CladeSnapshot) -> Result<bool> {
    let leaves = snapshot.leaves_of(clade);
    let ancestor = tree.common_ancestor_by_depth(&leaves, snapshot.depths())?;
    Ok(snapshot.clade(&ancestor)? == clade)
}
