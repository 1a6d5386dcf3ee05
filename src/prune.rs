//! Reduce a tree to a subset of its leaves.
//!
//! Leaves outside the kept set are removed, internal nodes left without
//! children disappear with them, and internal nodes left with a single child
//! are spliced out so the result has no degree-2 chains:
//!
//! ```text
//!   keep {A, B, C}
//!
//!            root                      root
//!           /    \                    /    \
//!        n1:1    n2:2      ==>      n1:1   C:5   (n2 spliced, 2 + 3)
//!       /   \    /   \             /   \
//!     A:1  B:1  C:3  n3           A:1  B:1
//!                    /  \
//!                   D    E
//! ```

use crate::error::{Error, Result};
use crate::tree::{Node, NodeId, Tree};
use itertools::Itertools;
use std::collections::BTreeSet;

/// What happens to branch lengths of spliced-out nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchLengths {
    /// Add the length of every spliced node to its surviving child, keeping
    /// all leaf-to-leaf path lengths intact.
    Preserve,
    /// Purely topological pruning; each surviving node keeps its own length.
    Discard,
}

/// Prune `tree` in place down to the leaves named in `keep`.
///
/// Support values of surviving internal nodes are left untouched and are
/// stale until recomputed.
///
/// # Errors
/// `InvalidInput` if `keep` is empty or names a leaf that is not in `tree`.
///
/// # Example
/// ```
/// use rust_python_subset_support::newick::{parse, to_newick};
/// use rust_python_subset_support::prune::{prune, BranchLengths};
/// use std::collections::BTreeSet;
///
/// let mut tree = parse("(((A:1,B:1):1,C:1):1,(D:1,E:1):1);").unwrap();
/// let keep: BTreeSet<String> = ["A", "B", "D"].map(String::from).into();
/// prune(&mut tree, &keep, BranchLengths::Preserve).unwrap();
/// assert_eq!(to_newick(&tree), "((A:1,B:1):2,D:2);");
/// ```
pub fn prune(tree: &mut Tree, keep: &BTreeSet<String>, lengths: BranchLengths) -> Result<()> {
    if keep.is_empty() {
        return Err(Error::InvalidInput("no leaves selected to keep".into()));
    }
    let present = tree.leaf_names();
    let missing = keep.difference(&present).collect_vec();
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "selected leaves not found in tree: {}",
            missing.iter().join(", ")
        )));
    }

    let kept = count_kept_leaves(tree, keep)?;
    let pruned = Pruner {
        source: tree,
        kept: &kept,
        lengths,
    }
    .build()?;
    *tree = pruned;
    Ok(())
}

/// Number of kept leaves in the subtree of every node.
fn count_kept_leaves(tree: &Tree, keep: &BTreeSet<String>) -> Result<Vec<usize>> {
    let mut kept = vec![0; tree.size()];
    for id in tree.postorder(&tree.root())? {
        let node = tree.get(&id)?;
        kept[id] = if node.is_leaf() {
            usize::from(node.name.as_ref().is_some_and(|name| keep.contains(name)))
        } else {
            node.children.iter().map(|child| kept[*child]).sum()
        };
    }
    Ok(kept)
}

struct Pruner<'a> {
    source: &'a Tree,
    kept: &'a [usize],
    lengths: BranchLengths,
}

impl Pruner<'_> {
    fn build(&self) -> Result<Tree> {
        let root_id = self.source.root();
        let root = self.source.get(&root_id)?;
        let survivors = self.surviving_children(&root_id)?;

        // The root stays. With a single surviving child, the root takes over
        // that child's (collapsed) subtree; the dropped edge lies on no
        // leaf-to-leaf path.
        let children = if survivors.len() == 1 {
            let (representative, _) = self.collapse(survivors[0])?;
            let node = self.source.get(&representative)?;
            if node.is_leaf() {
                let leaf = Node::named(node.name.clone().unwrap_or_default())
                    .with_branch_length(root.branch_length);
                return Ok(Tree::new(leaf));
            }
            self.surviving_children(&representative)?
        } else {
            survivors
        };

        let mut out = Tree::new(Self::detached(root, root.branch_length));
        let mut stack: Vec<(NodeId, NodeId)> =
            children.into_iter().rev().map(|c| (c, out.root())).collect();

        while let Some((child, parent)) = stack.pop() {
            let (representative, length) = self.collapse(child)?;
            let node = self.source.get(&representative)?;
            let id = out.add_child(parent, Self::detached(node, length))?;
            let grandchildren = self.surviving_children(&representative)?;
            stack.extend(grandchildren.into_iter().rev().map(|g| (g, id)));
        }

        Ok(out)
    }

    /// Follow a chain of nodes with exactly one surviving child down to the
    /// first node that is a leaf or keeps at least two children. Returns that
    /// node and the branch length it ends up with.
    fn collapse(&self, start: NodeId) -> Result<(NodeId, Option<f64>)> {
        let mut current = start;
        let mut length = self.source.get(&start)?.branch_length;
        loop {
            let survivors = self.surviving_children(&current)?;
            let [only] = survivors.as_slice() else {
                break;
            };
            let next = self.source.get(only)?;
            length = match self.lengths {
                BranchLengths::Preserve => add_lengths(length, next.branch_length),
                BranchLengths::Discard => next.branch_length,
            };
            current = *only;
        }
        Ok((current, length))
    }

    fn surviving_children(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .source
            .get(id)?
            .children
            .iter()
            .copied()
            .filter(|child| self.kept[*child] > 0)
            .collect())
    }

    fn detached(node: &Node, length: Option<f64>) -> Node {
        Node {
            name: node.name.clone(),
            branch_length: length,
            support: node.support,
            parent: None,
            children: Vec::new(),
        }
    }
}

fn add_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}
