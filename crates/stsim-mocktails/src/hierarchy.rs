// crates/stsim-mocktails/src/hierarchy.rs

//! A rooted tree of partitions. Splitting moves a parent's requests into its
//! children, so only leaves ever hold requests.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use std::collections::BTreeMap;

use stsim_core::{Error, Result};

use crate::partition::{Partition, SplitConfig};

/// The split policy applied at each level of the hierarchy. Level 0 is the
/// implicit monolithic root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// One split configuration per level.
    pub levels: Vec<SplitConfig>,
}

#[derive(Clone, Debug)]
struct Node {
    partition: Partition,
    children: Vec<u32>,
}

/// A rooted tree of partitions with parent back-links.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    nodes: BTreeMap<u32, Node>,
    parents: BTreeMap<u32, u32>,
    root_id: u32,
    last_id: u32,
}

impl Hierarchy {
    /// Create a hierarchy holding only the root partition.
    #[must_use]
    pub fn new(root: Partition) -> Self {
        let root_id = 0;
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id, Node { partition: root, children: Vec::new() });
        Self { nodes, parents: BTreeMap::new(), root_id, last_id: 1 }
    }

    /// Identifier of the root node.
    #[inline]
    #[must_use]
    pub const fn root_id(&self) -> u32 {
        self.root_id
    }

    /// Add a partition under a parent node, returning the new node's id.
    ///
    /// # Errors
    /// [`Error::Invariant`] when the parent does not exist.
    pub fn add_partition(&mut self, parent: u32, partition: Partition) -> Result<u32> {
        let child_id = self.last_id;

        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| Error::Invariant(format!("no parent node {parent}")))?;
        parent_node.children.push(child_id);

        self.last_id += 1;
        self.parents.insert(child_id, parent);
        self.nodes.insert(child_id, Node { partition, children: Vec::new() });

        Ok(child_id)
    }

    /// The partition at a node.
    ///
    /// # Errors
    /// [`Error::Invariant`] when the node does not exist.
    pub fn partition(&self, node_id: u32) -> Result<&Partition> {
        self.nodes
            .get(&node_id)
            .map(|n| &n.partition)
            .ok_or_else(|| Error::Invariant(format!("no node {node_id}")))
    }

    /// Mutable access to the partition at a node.
    ///
    /// # Errors
    /// [`Error::Invariant`] when the node does not exist.
    pub fn partition_mut(&mut self, node_id: u32) -> Result<&mut Partition> {
        self.nodes
            .get_mut(&node_id)
            .map(|n| &mut n.partition)
            .ok_or_else(|| Error::Invariant(format!("no node {node_id}")))
    }

    /// The children of a node.
    ///
    /// # Errors
    /// [`Error::Invariant`] when the node does not exist.
    pub fn children(&self, node_id: u32) -> Result<&[u32]> {
        self.nodes
            .get(&node_id)
            .map(|n| n.children.as_slice())
            .ok_or_else(|| Error::Invariant(format!("no node {node_id}")))
    }

    /// The parent of a node, `None` for the root.
    #[must_use]
    pub fn parent(&self, node_id: u32) -> Option<u32> {
        self.parents.get(&node_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_attach_under_their_parents() {
        let mut h = Hierarchy::new(Partition::default());
        let a = h.add_partition(h.root_id(), Partition::default()).unwrap();
        let b = h.add_partition(h.root_id(), Partition::default()).unwrap();
        let c = h.add_partition(a, Partition::default()).unwrap();

        assert_eq!(h.children(h.root_id()).unwrap(), &[a, b]);
        assert_eq!(h.children(a).unwrap(), &[c]);
        assert_eq!(h.parent(c), Some(a));
        assert_eq!(h.parent(h.root_id()), None);
        assert!(h.add_partition(99, Partition::default()).is_err());
        assert!(h.partition(c).is_ok());
    }
}
