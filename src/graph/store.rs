//! Committed graph state
//!
//! `GraphStore` only ever holds committed data. Transactions buffer their
//! writes elsewhere and hand the store a [`ChangeSet`] once every hook has
//! accepted the commit.

use super::edge::Edge;
use super::node::Node;
use super::types::{EdgeId, NodeId};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Net effect of one committed transaction
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Created or updated nodes, in their final state
    pub nodes: Vec<Node>,
    /// Created or updated edges, in their final state
    pub edges: Vec<Edge>,
    pub deleted_nodes: Vec<NodeId>,
    pub deleted_edges: Vec<EdgeId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.deleted_nodes.is_empty()
            && self.deleted_edges.is_empty()
    }
}

/// In-memory committed graph
///
/// - nodes: NodeId -> Node
/// - edges: EdgeId -> Edge
/// - adjacency: NodeId -> every EdgeId touching it, for cascading deletes
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    adjacency: HashMap<NodeId, HashSet<EdgeId>>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Ids of every committed edge starting or ending at `node`
    pub fn edges_of(&self, node: NodeId) -> Vec<EdgeId> {
        self.adjacency
            .get(&node)
            .map(|edges| edges.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Highest node id in use, if any
    pub fn max_node_id(&self) -> Option<u64> {
        self.nodes.keys().map(NodeId::as_u64).max()
    }

    /// Highest edge id in use, if any
    pub fn max_edge_id(&self) -> Option<u64> {
        self.edges.keys().map(EdgeId::as_u64).max()
    }

    /// Apply a validated change set
    ///
    /// Deletions go first so an id freed and reused inside the same change
    /// set cannot be clobbered.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for id in &changes.deleted_edges {
            self.remove_edge(*id);
        }
        for id in &changes.deleted_nodes {
            for edge_id in self.edges_of(*id) {
                self.remove_edge(edge_id);
            }
            self.nodes.remove(id);
            self.adjacency.remove(id);
        }
        for node in &changes.nodes {
            self.nodes.insert(node.id, node.clone());
        }
        for edge in &changes.edges {
            self.link(edge);
            self.edges.insert(edge.id, edge.clone());
        }
    }

    /// Insert a node read back from persistent storage
    pub fn insert_recovered_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Insert an edge read back from persistent storage
    ///
    /// Source and target nodes must already have been recovered.
    pub fn insert_recovered_edge(&mut self, edge: Edge) -> GraphResult<()> {
        if !self.has_node(edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source));
        }
        if !self.has_node(edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target));
        }
        self.link(&edge);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    fn link(&mut self, edge: &Edge) {
        self.adjacency.entry(edge.source).or_default().insert(edge.id);
        self.adjacency.entry(edge.target).or_default().insert(edge.id);
    }

    fn remove_edge(&mut self, id: EdgeId) {
        if let Some(edge) = self.edges.remove(&id) {
            for end in [edge.source, edge.target] {
                if let Some(adj) = self.adjacency.get_mut(&end) {
                    adj.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::{props, PropertyMap};
    use crate::graph::types::Label;

    fn person(id: u64) -> Node {
        Node::new(NodeId::new(id), vec![Label::new("Person")], PropertyMap::new())
    }

    fn knows(id: u64, from: u64, to: u64) -> Edge {
        Edge::new(EdgeId::new(id), NodeId::new(from), NodeId::new(to), "KNOWS", PropertyMap::new())
    }

    #[test]
    fn test_apply_creates_and_updates() {
        let mut store = GraphStore::new();
        store.apply(&ChangeSet {
            nodes: vec![person(0), person(1)],
            edges: vec![knows(0, 0, 1)],
            ..Default::default()
        });

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.edges_of(NodeId::new(0)), vec![EdgeId::new(0)]);
        assert_eq!(store.edges_of(NodeId::new(1)), vec![EdgeId::new(0)]);

        let mut updated = person(0);
        updated.properties = props([("name", "Luanne")]);
        store.apply(&ChangeSet { nodes: vec![updated], ..Default::default() });
        assert_eq!(
            store.get_node(NodeId::new(0)).unwrap().get_property("name").unwrap().as_string(),
            Some("Luanne")
        );
    }

    #[test]
    fn test_delete_node_cascades_edges() {
        let mut store = GraphStore::new();
        store.apply(&ChangeSet {
            nodes: vec![person(0), person(1), person(2)],
            edges: vec![knows(0, 0, 1), knows(1, 2, 0), knows(2, 1, 2)],
            ..Default::default()
        });

        store.apply(&ChangeSet { deleted_nodes: vec![NodeId::new(0)], ..Default::default() });

        assert!(!store.has_node(NodeId::new(0)));
        assert!(!store.has_edge(EdgeId::new(0)));
        assert!(!store.has_edge(EdgeId::new(1)));
        assert!(store.has_edge(EdgeId::new(2)));
        assert_eq!(store.edges_of(NodeId::new(1)), vec![EdgeId::new(2)]);
    }

    #[test]
    fn test_recovery_inserts() {
        let mut store = GraphStore::new();
        assert_eq!(
            store.insert_recovered_edge(knows(0, 0, 1)),
            Err(GraphError::InvalidEdgeSource(NodeId::new(0)))
        );

        store.insert_recovered_node(person(0));
        store.insert_recovered_node(person(4));
        assert_eq!(
            store.insert_recovered_edge(knows(0, 0, 1)),
            Err(GraphError::InvalidEdgeTarget(NodeId::new(1)))
        );
        store.insert_recovered_edge(knows(9, 0, 4)).unwrap();

        assert_eq!(store.max_node_id(), Some(4));
        assert_eq!(store.max_edge_id(), Some(9));
    }

    #[test]
    fn test_empty_change_set() {
        assert!(ChangeSet::default().is_empty());
        assert!(!ChangeSet { deleted_edges: vec![EdgeId::new(1)], ..Default::default() }.is_empty());
    }
}
