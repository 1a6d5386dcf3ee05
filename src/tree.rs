//! Arena-based rooted phylogenetic tree.
//!
//! # Overview
//! Nodes live in a `Vec<Node>` and refer to each other by index ([`NodeId`]).
//! A node owns its children only through the ordered `children` list; the
//! `parent` field is a plain back-reference used for upward walks (LCA, depth).
//!
//! ```text
//!            root (0)
//!           /        \
//!        n1 (1)      n4 (4)
//!       /     \      /    \
//!     A (2)  B (3) C (5)  D (6)
//! ```
//!
//! Ids are assigned in insertion order, so for parsed trees the root is 0 and
//! ids follow the textual (pre-)order of the Newick string.

use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Index of a node inside its [`Tree`].
pub type NodeId = usize;

/// A single node of a [`Tree`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Taxon name for leaves, optional label for internal nodes
    pub name: Option<String>,
    /// Length of the edge leading to the parent
    pub branch_length: Option<f64>,
    /// Support value, only meaningful on internal nodes
    pub support: Option<f64>,
    /// Back-reference to the parent, `None` for the root
    pub parent: Option<NodeId>,
    /// Ordered children
    pub children: Vec<NodeId>,
}

impl Node {
    /// Create an unattached node with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Node {
            name: Some(name.into()),
            ..Node::default()
        }
    }

    /// Set the length of the edge leading to the parent.
    pub fn with_branch_length(mut self, length: Option<f64>) -> Self {
        self.branch_length = length;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted tree owning all of its nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Create a tree consisting of a single root node.
    pub fn new(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        Tree {
            nodes: vec![root],
            root: 0,
        }
    }

    /// Attach `node` as the last child of `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        self.get(&parent)?;
        let id = self.nodes.len();
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: &NodeId) -> Result<&Node> {
        self.nodes
            .get(*id)
            .ok_or_else(|| Error::NotFound(format!("no node with index {id}")))
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(*id)
            .ok_or_else(|| Error::NotFound(format!("no node with index {id}")))
    }

    /// Number of nodes (leaves and internal nodes).
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Ids of all leaves, in id order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.is_leaf())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Ids of all internal nodes in level order, root first.
    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.levelorder_from_root()
            .into_iter()
            .filter(|id| !self.nodes[*id].is_leaf())
            .collect()
    }
}

// ##############
// # TRAVERSALS #
// ##############

impl Tree {
    /// Nodes of the subtree below `from`, parents before children.
    pub fn preorder(&self, from: &NodeId) -> Result<Vec<NodeId>> {
        self.get(from)?;
        let mut order = Vec::new();
        let mut stack = vec![*from];
        while let Some(id) = stack.pop() {
            order.push(id);
            // reversed so that the first child is visited first
            stack.extend(self.nodes[id].children.iter().rev());
        }
        Ok(order)
    }

    /// Nodes of the subtree below `from`, children before parents.
    pub fn postorder(&self, from: &NodeId) -> Result<Vec<NodeId>> {
        self.get(from)?;
        let mut order = Vec::new();
        let mut stack = vec![(*from, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            stack.extend(self.nodes[id].children.iter().rev().map(|c| (*c, false)));
        }
        Ok(order)
    }

    /// Nodes of the subtree below `from`, depth by depth.
    pub fn levelorder(&self, from: &NodeId) -> Result<Vec<NodeId>> {
        self.get(from)?;
        let mut order = Vec::new();
        let mut queue = VecDeque::from([*from]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            queue.extend(self.nodes[id].children.iter());
        }
        Ok(order)
    }

    fn levelorder_from_root(&self) -> Vec<NodeId> {
        // The root always exists, so this cannot fail.
        self.levelorder(&self.root).unwrap_or_default()
    }
}

// ##########
// # LEAVES #
// ##########

impl Tree {
    /// Names of all leaves of the tree.
    pub fn leaf_names(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf())
            .filter_map(|node| node.name.clone())
            .collect()
    }

    /// Names of the leaves below `node` (the node's clade).
    pub fn subtree_leaf_names(&self, node: &NodeId) -> Result<BTreeSet<String>> {
        Ok(self
            .preorder(node)?
            .into_iter()
            .map(|id| &self.nodes[id])
            .filter(|node| node.is_leaf())
            .filter_map(|node| node.name.clone())
            .collect())
    }

    /// Find the leaf carrying `name`.
    ///
    /// # Errors
    /// `NotFound` if no leaf has this name or if several leaves share it.
    pub fn find_leaf(&self, name: &str) -> Result<NodeId> {
        let mut matches = self
            .nodes()
            .filter(|(_, node)| node.is_leaf() && node.name.as_deref() == Some(name))
            .map(|(id, _)| id);

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(Error::NotFound(format!("no leaf named '{name}'"))),
            (Some(_), Some(_)) => Err(Error::NotFound(format!(
                "leaf name '{name}' is ambiguous"
            ))),
        }
    }

    /// Map from leaf name to leaf id, built once for repeated lookups.
    ///
    /// # Errors
    /// `InvariantViolation` if a leaf is unnamed or a name is used twice.
    pub fn leaf_lookup(&self) -> Result<HashMap<String, NodeId>> {
        let mut lookup = HashMap::new();
        for (id, node) in self.nodes().filter(|(_, node)| node.is_leaf()) {
            let name = node.name.clone().ok_or_else(|| {
                Error::InvariantViolation(format!("leaf {id} has no name"))
            })?;
            if lookup.insert(name.clone(), id).is_some() {
                return Err(Error::InvariantViolation(format!(
                    "leaf name '{name}' occurs more than once"
                )));
            }
        }
        Ok(lookup)
    }
}

// #######################
// # ANCESTRY AND DEPTHS #
// #######################

impl Tree {
    /// Number of edges between each node and the root, indexed by node id.
    pub fn depths(&self) -> Result<Vec<usize>> {
        let mut depths = vec![0; self.nodes.len()];
        for id in self.levelorder(&self.root)? {
            for child in &self.get(&id)?.children {
                depths[*child] = depths[id] + 1;
            }
        }
        Ok(depths)
    }

    /// Lowest common ancestor of a non-empty set of leaves.
    ///
    /// Computes all depths first; when querying the same tree repeatedly use
    /// [`Tree::common_ancestor_by_depth`] with depths from [`Tree::depths`].
    ///
    /// # Errors
    /// `InvalidInput` if `leaves` is empty or contains an id that is not a
    /// leaf of this tree.
    pub fn common_ancestor(&self, leaves: &[NodeId]) -> Result<NodeId> {
        self.common_ancestor_by_depth(leaves, &self.depths()?)
    }

    /// Lowest common ancestor of `leaves`, climbing with precomputed `depths`.
    ///
    /// Climbs stop at the meeting node; nothing walks back to the root.
    ///
    /// # Errors
    /// `InvalidInput` if `leaves` is empty, contains an id that is not a leaf
    /// of this tree, or `depths` does not cover every node.
    pub fn common_ancestor_by_depth(&self, leaves: &[NodeId], depths: &[usize]) -> Result<NodeId> {
        let (first, rest) = leaves
            .split_first()
            .ok_or_else(|| Error::InvalidInput("common ancestor of an empty set".into()))?;
        if depths.len() != self.nodes.len() {
            return Err(Error::InvalidInput(format!(
                "{} depths given for a tree of {} nodes",
                depths.len(),
                self.nodes.len()
            )));
        }

        for id in leaves {
            match self.nodes.get(*id) {
                Some(node) if node.is_leaf() => {}
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "node {id} is not a leaf of this tree"
                    )));
                }
            }
        }

        let mut ancestor = *first;
        for leaf in rest {
            ancestor = self.pair_ancestor(ancestor, *leaf, depths)?;
            if ancestor == self.root {
                break;
            }
        }
        Ok(ancestor)
    }

    /// Climb from both nodes until the paths meet.
    fn pair_ancestor(&self, mut a: NodeId, mut b: NodeId, depths: &[usize]) -> Result<NodeId> {
        while depths[a] > depths[b] {
            a = self.parent_of(a)?;
        }
        while depths[b] > depths[a] {
            b = self.parent_of(b)?;
        }
        while a != b {
            a = self.parent_of(a)?;
            b = self.parent_of(b)?;
        }
        Ok(a)
    }

    fn parent_of(&self, id: NodeId) -> Result<NodeId> {
        self.get(&id)?.parent.ok_or_else(|| {
            Error::InvariantViolation(format!("node {id} has no parent but is not the root"))
        })
    }
}
