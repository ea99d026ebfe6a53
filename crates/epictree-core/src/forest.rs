//! The assembled, ordered collection of work-item nodes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::types::{Node, NodeId};

/// Structural defects of a forest, usually from a hand-edited snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("Work item {0} appears more than once")]
    DuplicateNode(NodeId),

    #[error("Work item {parent} lists unknown child {child}")]
    MissingChild { parent: NodeId, child: NodeId },

    #[error("Work item {child} is listed under {listed_by} but its parent is {parent:?}")]
    ParentMismatch {
        child: NodeId,
        listed_by: NodeId,
        parent: Option<NodeId>,
    },

    #[error("Work item {child} refers to unknown parent {parent}")]
    MissingParent { child: NodeId, parent: NodeId },

    #[error("Work item {child} is not listed among the children of its parent {parent}")]
    NotListed { child: NodeId, parent: NodeId },

    #[error("Work item {0} has no root in its parent chain")]
    ParentCycle(NodeId),
}

/// Nodes in pre-order: every root is followed by its whole subtree before
/// the next root begins.
///
/// Serialized as a plain JSON array of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    nodes: Vec<Node>,
    positions: HashMap<NodeId, usize>,
}

impl Forest {
    /// Wrap an already ordered node list
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut positions = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            positions.entry(node.id).or_insert(position);
        }
        Self { nodes, positions }
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Iterate over all nodes in pre-order
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id).map(|&position| &self.nodes[position])
    }

    /// Whether a node with this id exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Parentless nodes, in order
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_root())
    }

    /// Children of `id`, in order. Empty if the id is unknown.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.get(*child))
    }

    /// Ids in pre-order
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    /// Distance from the node to its root (roots have depth 0)
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut node = self.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Check that parent and child links agree with each other
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.positions.len() != self.nodes.len() {
            let mut seen = HashSet::with_capacity(self.nodes.len());
            for node in &self.nodes {
                if !seen.insert(node.id) {
                    return Err(ForestError::DuplicateNode(node.id));
                }
            }
        }

        for node in &self.nodes {
            for child_id in &node.children {
                let child = self.get(*child_id).ok_or(ForestError::MissingChild {
                    parent: node.id,
                    child: *child_id,
                })?;
                if child.parent != Some(node.id) {
                    return Err(ForestError::ParentMismatch {
                        child: *child_id,
                        listed_by: node.id,
                        parent: child.parent,
                    });
                }
            }

            if let Some(parent_id) = node.parent {
                let parent = self.get(parent_id).ok_or(ForestError::MissingParent {
                    child: node.id,
                    parent: parent_id,
                })?;
                if !parent.children.contains(&node.id) {
                    return Err(ForestError::NotListed {
                        child: node.id,
                        parent: parent_id,
                    });
                }
            }
        }

        self.check_rooted()
    }

    /// Every parent chain must end at a root. Links are known to be
    /// consistent here, so a chain longer than the forest is a cycle.
    fn check_rooted(&self) -> Result<(), ForestError> {
        let mut rooted: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut chain = Vec::new();
            let mut current = node;
            while let Some(parent) = current.parent {
                if rooted.contains(&current.id) {
                    break;
                }
                chain.push(current.id);
                if chain.len() > self.nodes.len() {
                    return Err(ForestError::ParentCycle(node.id));
                }
                current = self.get(parent).ok_or(ForestError::MissingParent {
                    child: current.id,
                    parent,
                })?;
            }
            rooted.extend(chain);
        }
        Ok(())
    }

    /// Consume the forest, returning its nodes in pre-order
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

impl From<Vec<Node>> for Forest {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_nodes(nodes)
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl Serialize for Forest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.nodes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Forest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Node>::deserialize(deserializer).map(Self::from_nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkItemType;
    use pretty_assertions::assert_eq;

    fn node(id: u32, parent: Option<u32>, children: &[u32]) -> Node {
        Node {
            id: NodeId(id),
            title: format!("Item {}", id),
            description: None,
            acceptance_criteria: None,
            work_item_type: WorkItemType::Story,
            tags: vec![],
            parent: parent.map(NodeId),
            children: children.iter().copied().map(NodeId).collect(),
        }
    }

    fn sample() -> Forest {
        Forest::from_nodes(vec![
            node(1, None, &[2, 3]),
            node(2, Some(1), &[4]),
            node(4, Some(2), &[]),
            node(3, Some(1), &[]),
            node(9, None, &[]),
        ])
    }

    #[test]
    fn test_navigation() {
        let forest = sample();

        assert_eq!(forest.len(), 5);
        assert_eq!(forest.ids(), vec![NodeId(1), NodeId(2), NodeId(4), NodeId(3), NodeId(9)]);
        assert_eq!(forest.roots().map(|n| n.id).collect::<Vec<_>>(), vec![NodeId(1), NodeId(9)]);
        assert_eq!(
            forest.children(NodeId(1)).map(|n| n.id).collect::<Vec<_>>(),
            vec![NodeId(2), NodeId(3)]
        );
        assert_eq!(forest.children(NodeId(42)).count(), 0);
        assert_eq!(forest.depth(NodeId(4)), Some(2));
        assert_eq!(forest.depth(NodeId(9)), Some(0));
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_serializes_as_array() {
        let forest = sample();
        let json = serde_json::to_value(&forest).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 5);

        let back: Forest = serde_json::from_value(json).unwrap();
        assert_eq!(back, forest);
        assert_eq!(back.get(NodeId(4)).unwrap().parent, Some(NodeId(2)));
    }

    #[test]
    fn test_validate_detects_broken_links() {
        let missing_child = Forest::from_nodes(vec![node(1, None, &[2])]);
        assert_eq!(
            missing_child.validate(),
            Err(ForestError::MissingChild { parent: NodeId(1), child: NodeId(2) })
        );

        let not_listed = Forest::from_nodes(vec![node(1, None, &[]), node(2, Some(1), &[])]);
        assert_eq!(
            not_listed.validate(),
            Err(ForestError::NotListed { child: NodeId(2), parent: NodeId(1) })
        );

        let duplicate = Forest::from_nodes(vec![node(1, None, &[]), node(1, None, &[])]);
        assert_eq!(duplicate.validate(), Err(ForestError::DuplicateNode(NodeId(1))));
    }

    #[test]
    fn test_validate_rejects_parent_cycles() {
        let pair = Forest::from_nodes(vec![node(1, Some(2), &[2]), node(2, Some(1), &[1])]);
        assert_eq!(pair.depth(NodeId(1)), None);
        assert_eq!(pair.validate(), Err(ForestError::ParentCycle(NodeId(1))));

        let own_parent = Forest::from_nodes(vec![node(5, None, &[]), node(7, Some(7), &[7])]);
        assert_eq!(own_parent.validate(), Err(ForestError::ParentCycle(NodeId(7))));

        let deep = Forest::from_nodes(vec![
            node(1, None, &[2]),
            node(2, Some(1), &[3]),
            node(3, Some(2), &[4]),
            node(4, Some(3), &[]),
        ]);
        assert!(deep.validate().is_ok());
    }
}
