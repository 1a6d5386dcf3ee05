//! Clade snapshots of trees over a shared leaf index.
//!
//! # Overview
//! A [`CladeSnapshot`] stores, for every node of a tree, the bitset of the
//! leaves below it, plus the reverse mapping from bit position to leaf node.
//! Snapshots are immutable and can be shared between rayon workers.
//!
//! ```text
//!            root            A=0, B=1, C=2, D=3
//!           /    \
//!        n1       n2         n1   → 0b0011
//!       /  \     /  \        n2   → 0b1100
//!      A    B   C    D       root → 0b1111
//! ```
//!
//! # Why taxon NAMES and not node ids
//! Node ids depend on the textual layout of each Newick record and differ
//! between replicates. Names are stable, so the [`LeafIndex`] sorts names
//! alphabetically and every tree is mapped through the same index: identical
//! clades then get identical bitsets.

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree};
use std::collections::HashMap;

/// Alphabetical mapping from leaf name to bit position.
#[derive(Debug, Clone)]
pub struct LeafIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LeafIndex {
    /// Build the index from the leaves of `tree`.
    ///
    /// # Errors
    /// `InvariantViolation` if a leaf is unnamed or names are not unique.
    pub fn from_tree(tree: &Tree) -> Result<Self> {
        let mut names: Vec<String> = tree.leaf_lookup()?.into_keys().collect();
        names.sort();
        let positions = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Ok(LeafIndex { names, positions })
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    fn words(&self) -> usize {
        Bitset::words_for(self.names.len())
    }
}

/// Per-node clade bitsets of one tree.
#[derive(Debug, Clone)]
pub struct CladeSnapshot {
    /// Clade of every node, indexed by [`NodeId`]
    clades: Vec<Bitset>,
    /// Leaf node carrying each bit position
    leaf_nodes: Vec<NodeId>,
    /// Edges from each node to the root
    depths: Vec<usize>,
}

impl CladeSnapshot {
    /// Compute the clade of every node of `tree` over `index`.
    ///
    /// # Algorithm
    /// 1. Map every leaf to its bit through the shared index
    /// 2. Walk the tree in post-order, OR-ing child bitsets into their parent
    ///
    /// # Errors
    /// `InvariantViolation` if the leaf set of `tree` is not exactly the set
    /// of names in `index`.
    pub fn from_tree(tree: &Tree, index: &LeafIndex) -> Result<Self> {
        let words = index.words();
        let lookup = tree.leaf_lookup()?;
        if lookup.len() != index.len() {
            return Err(Error::InvariantViolation(format!(
                "tree has {} leaves, expected {}",
                lookup.len(),
                index.len()
            )));
        }

        let mut leaf_nodes = vec![0; index.len()];
        for (name, node) in &lookup {
            let position = index.position(name).ok_or_else(|| {
                Error::InvariantViolation(format!("leaf '{name}' is not part of the reference"))
            })?;
            leaf_nodes[position] = *node;
        }

        let mut clades = vec![Bitset::zeros(words); tree.size()];
        for id in tree.postorder(&tree.root())? {
            let node = tree.get(&id)?;
            if node.is_leaf() {
                // every leaf is named, checked by leaf_lookup above
                if let Some(position) = node.name.as_deref().and_then(|n| index.position(n)) {
                    clades[id].set(position);
                }
                continue;
            }
            let mut clade = Bitset::zeros(words);
            for child in &node.children {
                clade.or_assign(&clades[*child]);
            }
            clades[id] = clade;
        }

        Ok(CladeSnapshot {
            clades,
            leaf_nodes,
            depths: tree.depths()?,
        })
    }

    /// Leaf set below `node`.
    pub fn clade(&self, node: &NodeId) -> Result<&Bitset> {
        self.clades
            .get(*node)
            .ok_or_else(|| Error::NotFound(format!("no node with index {node}")))
    }

    /// Depth of every node, for [`Tree::common_ancestor_by_depth`].
    pub fn depths(&self) -> &[usize] {
        &self.depths
    }

    /// Leaf nodes of this tree carrying the bits set in `clade`.
    pub fn leaves_of(&self, clade: &Bitset) -> Vec<NodeId> {
        clade
            .ones()
            .filter_map(|position| self.leaf_nodes.get(position).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse;

    #[test]
    fn leaf_index_is_alphabetical() {
        let tree = parse("((Human,Chimp),(Gorilla,Bonobo));").unwrap();
        let index = LeafIndex::from_tree(&tree).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.position("Bonobo"), Some(0));
        assert_eq!(index.position("Chimp"), Some(1));
        assert_eq!(index.position("Gorilla"), Some(2));
        assert_eq!(index.position("Human"), Some(3));
        assert_eq!(index.position("Orangutan"), None);
    }

    /// Same taxa in a different textual order give identical clade bitsets.
    ///
    /// ```text
    /// tree 1: ((Human,Chimp),(Gorilla,Bonobo))   Human=3 Chimp=1
    /// tree 2: ((Bonobo,Gorilla),(Chimp,Human))
    /// {Chimp, Human} → 0b1010 in both trees
    /// ```
    #[test]
    fn clades_are_independent_of_node_ids() {
        let t1 = parse("((Human,Chimp),(Gorilla,Bonobo));").unwrap();
        let t2 = parse("((Bonobo,Gorilla),(Chimp,Human));").unwrap();
        let index = LeafIndex::from_tree(&t1).unwrap();

        let s1 = CladeSnapshot::from_tree(&t1, &index).unwrap();
        let s2 = CladeSnapshot::from_tree(&t2, &index).unwrap();

        assert_eq!(s1.clade(&1).unwrap().0[0], 0b1010);
        assert_eq!(s2.clade(&4).unwrap().0[0], 0b1010);
        assert_eq!(s1.clade(&0).unwrap().0[0], 0b1111);
        assert_eq!(s1.clade(&0).unwrap(), s2.clade(&0).unwrap());
    }

    #[test]
    fn leaves_of_maps_back_to_nodes() {
        let tree = parse("((A,B),(C,(D,E)));").unwrap();
        let index = LeafIndex::from_tree(&tree).unwrap();
        let snap = CladeSnapshot::from_tree(&tree, &index).unwrap();

        // node 4 is (C,(D,E)), leaves C=5, D=7, E=8
        let clade = snap.clade(&4).unwrap();
        assert_eq!(clade.count_ones(), 3);
        assert_eq!(snap.leaves_of(clade), vec![5, 7, 8]);
        assert_eq!(snap.depths(), &[0, 1, 2, 2, 1, 2, 2, 3, 3]);
        assert!(matches!(snap.clade(&99), Err(Error::NotFound(_))));
    }

    #[test]
    fn foreign_leaf_sets_are_rejected() {
        let reference = parse("((A,B),(C,D));").unwrap();
        let index = LeafIndex::from_tree(&reference).unwrap();

        let renamed = parse("((A,B),(C,X));").unwrap();
        assert!(matches!(
            CladeSnapshot::from_tree(&renamed, &index),
            Err(Error::InvariantViolation(_))
        ));

        let smaller = parse("((A,B),C);").unwrap();
        assert!(matches!(
            CladeSnapshot::from_tree(&smaller, &index),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn many_leaves_span_several_words() {
        let names: Vec<String> = (0..130).map(|i| format!("t{i:03}")).collect();
        let text = format!("({});", names.join(","));
        let tree = parse(&text).unwrap();
        let index = LeafIndex::from_tree(&tree).unwrap();
        let snap = CladeSnapshot::from_tree(&tree, &index).unwrap();

        let root = snap.clade(&0).unwrap();
        assert_eq!(root.0.len(), 3);
        assert_eq!(root.count_ones(), 130);
    }
}
