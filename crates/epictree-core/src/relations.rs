//! Source-keyed index over a flat relation edge list.

use std::collections::HashMap;

use crate::types::{Edge, NodeId};

/// Edges grouped by their source, built once per run.
///
/// Both root edges and per-source child lists keep the order in which the
/// backend returned them.
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    roots: Vec<Edge>,
    by_source: HashMap<NodeId, Vec<Edge>>,
    edge_count: usize,
}

impl RelationIndex {
    /// Index `edges` in a single pass
    pub fn new(edges: &[Edge]) -> Self {
        let mut roots = Vec::new();
        let mut by_source: HashMap<NodeId, Vec<Edge>> = HashMap::new();

        for edge in edges {
            match edge.source {
                None => roots.push(*edge),
                Some(source) => by_source.entry(source).or_default().push(*edge),
            }
        }

        Self {
            roots,
            by_source,
            edge_count: edges.len(),
        }
    }

    /// Edges without a source, in input order
    pub fn roots(&self) -> &[Edge] {
        &self.roots
    }

    /// Edges whose source is `id`, in input order
    pub fn children_of(&self, id: NodeId) -> &[Edge] {
        self.by_source.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of indexed edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of distinct non-root sources
    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }

    /// Whether the index holds no edges
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

impl From<&[Edge]> for RelationIndex {
    fn from(edges: &[Edge]) -> Self {
        Self::new(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roots_and_children_keep_order() {
        let edges = vec![
            Edge::child(1, 3),
            Edge::root(1),
            Edge::child(1, 2),
            Edge::root(9),
            Edge::child(2, 4),
        ];
        let index = RelationIndex::new(&edges);

        assert_eq!(index.roots(), &[Edge::root(1), Edge::root(9)]);
        assert_eq!(index.children_of(NodeId(1)), &[Edge::child(1, 3), Edge::child(1, 2)]);
        assert_eq!(index.children_of(NodeId(2)), &[Edge::child(2, 4)]);
        assert!(index.children_of(NodeId(4)).is_empty());
        assert_eq!(index.edge_count(), 5);
        assert_eq!(index.source_count(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = RelationIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.roots().is_empty());
        assert!(index.children_of(NodeId(1)).is_empty());
    }
}
