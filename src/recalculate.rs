//! Recompute bootstrap support for a subset of taxa.
//!
//! This is the glue between the loaded trees and the core algorithms:
//!
//! 1. check that the reference has a meaningful topology and that every
//!    bootstrap tree has exactly the reference's taxa
//! 2. prune the reference to the selected taxa, keeping branch lengths
//! 3. prune every bootstrap tree to the same taxa, topology only
//! 4. recompute the support of every internal node of the pruned reference

use crate::error::{Error, Result};
use crate::prune::{prune, BranchLengths};
use crate::support::{recompute_support, SupportChange};
use crate::tree::Tree;
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Pruned reference with fresh support values.
#[derive(Debug, Clone)]
pub struct Recalculation {
    pub tree: Tree,
    pub changes: Vec<SupportChange>,
    pub replicates: usize,
}

/// Check that every bootstrap tree carries exactly the reference's taxa.
///
/// # Errors
/// `Replicate { index, .. }` wrapping `InvalidInput` for the first offending
/// tree, listing missing and unexpected taxa.
pub fn validate_replicates(reference: &Tree, replicates: &[Tree]) -> Result<()> {
    let expected = reference.leaf_names();
    for (index, replicate) in replicates.iter().enumerate() {
        let found = replicate.leaf_names();
        if found == expected && found.len() == replicate.n_leaves() {
            continue;
        }
        let missing = expected.difference(&found).join(", ");
        let extra = found.difference(&expected).join(", ");
        let message = match (missing.is_empty(), extra.is_empty()) {
            (false, false) => format!(
                "leaf set differs from the reference: missing [{missing}], unexpected [{extra}]"
            ),
            (false, true) => format!("leaf set differs from the reference: missing [{missing}]"),
            (true, false) => format!("leaf set differs from the reference: unexpected [{extra}]"),
            (true, true) => "leaf set differs from the reference".to_string(),
        };
        return Err(Error::InvalidInput(message).in_replicate(index));
    }
    Ok(())
}

/// Prune `reference` and `replicates` to `selected` and recompute support.
///
/// Nothing is pruned or scored unless all inputs pass validation.
///
/// # Errors
/// - `InvalidInput` if the reference has fewer than two leaves, fewer than
///   two taxa are selected, a selected taxon is unknown, or no bootstrap trees
///   are given
/// - `Replicate { index, .. }` if a bootstrap tree has a different leaf set
pub fn recalculate_for_subset(
    mut reference: Tree,
    mut replicates: Vec<Tree>,
    selected: &BTreeSet<String>,
) -> Result<Recalculation> {
    if reference.n_leaves() < 2 {
        return Err(Error::InvalidInput(format!(
            "reference tree has {} leaf, at least two are needed",
            reference.n_leaves()
        )));
    }
    if selected.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "{} taxa selected, at least two are needed",
            selected.len()
        )));
    }
    if replicates.is_empty() {
        return Err(Error::InvalidInput("no bootstrap trees given".into()));
    }
    validate_replicates(&reference, &replicates)?;

    prune(&mut reference, selected, BranchLengths::Preserve)?;
    replicates
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(i, tree)| {
            prune(tree, selected, BranchLengths::Discard).map_err(|e| e.in_replicate(i))
        })?;

    let changes = recompute_support(&mut reference, &replicates)?;
    Ok(Recalculation {
        tree: reference,
        changes,
        replicates: replicates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::{parse, to_newick};

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn trees(texts: &[&str]) -> Vec<Tree> {
        texts.iter().map(|t| parse(t).unwrap()).collect()
    }

    #[test]
    fn four_taxa_without_pruning() {
        let reference = parse("((A,B),(C,D));").unwrap();
        let replicates = trees(&["((A,B),(C,D));", "((A,C),(B,D));"]);

        let result = recalculate_for_subset(reference, replicates, &names(&["A", "B", "C", "D"]))
            .unwrap();

        assert_eq!(to_newick(&result.tree), "((A,B)50,(C,D)50)100;");
        assert_eq!(result.replicates, 2);
        assert_eq!(result.changes.len(), 3);
    }

    #[test]
    fn subset_of_five_taxa() {
        let reference = parse("(((A:1,B:1)90:1,C:1)80:1,(D:1,E:1)70:1);").unwrap();
        let replicates = trees(&[
            "(((A,B),C),(D,E));",
            "(((A,C),B),(D,E));",
            "(((A,B),D),(C,E));",
            "((A,(B,C)),(D,E));",
        ]);

        let result =
            recalculate_for_subset(reference, replicates, &names(&["A", "B", "C"])).unwrap();

        // replicates pruned to {A,B,C}: ((A,B),C) ((A,C),B) ((A,B),C) (A,(B,C))
        assert_eq!(to_newick(&result.tree), "((A:1,B:1)50:1,C:1)100;");
        assert_eq!(result.tree.leaf_names(), names(&["A", "B", "C"]));
    }

    #[test]
    fn mismatched_replicate_stops_before_scoring() {
        let reference = parse("((A,B),(C,D));").unwrap();
        let replicates = trees(&["((A,B),(C,D));", "((A,B),(C,D));", "((A,B),(C,E));"]);

        let err = recalculate_for_subset(reference, replicates, &names(&["A", "B", "C"]))
            .unwrap_err();

        match err {
            Error::Replicate { index, source } => {
                assert_eq!(index, 2);
                let text = source.to_string();
                assert!(text.contains("missing [D]"), "{text}");
                assert!(text.contains("unexpected [E]"), "{text}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn replicate_with_extra_taxon_is_rejected() {
        let reference = parse("((A,B),(C,D));").unwrap();
        let replicates = trees(&["((A,B),(C,(D,E)));"]);
        let err = validate_replicates(&reference, &replicates).unwrap_err();
        assert!(err.to_string().contains("unexpected [E]"));
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let replicates = trees(&["((A,B),(C,D));"]);
        let all = names(&["A", "B", "C", "D"]);

        let single = parse("(A);").unwrap();
        assert!(matches!(
            recalculate_for_subset(single, replicates.clone(), &all),
            Err(Error::InvalidInput(_))
        ));

        let reference = parse("((A,B),(C,D));").unwrap();
        assert!(matches!(
            recalculate_for_subset(reference.clone(), replicates.clone(), &names(&["A"])),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            recalculate_for_subset(reference.clone(), Vec::new(), &all),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            recalculate_for_subset(reference, replicates, &names(&["A", "Z"])),
            Err(Error::InvalidInput(_))
        ));
    }
}
