//! Buffered transactions over [`GraphDatabase`]
//!
//! All mutations are kept in a private overlay until [`Transaction::commit`].
//! The commit runs every registered [`TransactionHook`](super::TransactionHook)
//! against the overlay and only then applies it, so hook writes and the
//! caller's writes become visible together or not at all.
//!
//! Dropping a `Transaction` without committing discards it.

use super::database::GraphDatabase;
use super::edge::Edge;
use super::hook::HookError;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::store::{ChangeSet, GraphError, GraphStore};
use super::types::{EdgeId, EdgeType, EntityId, Label, NodeId};
use crate::persistence::StorageError;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("graph error during transaction: {0}")]
    Graph(#[from] GraphError),

    #[error("transaction hook '{hook}' failed: {source}")]
    HookFailed {
        hook: String,
        #[source]
        source: HookError,
    },

    #[error("storage error during commit: {0}")]
    Storage(#[from] StorageError),

    #[error("graph store lock poisoned")]
    LockPoisoned,
}

impl TxError {
    /// True when a hook vetoed the transaction
    pub fn is_hook_failure(&self) -> bool {
        matches!(self, TxError::HookFailed { .. })
    }

    /// The concrete error a hook vetoed with, if it is an `E`
    pub fn hook_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            TxError::HookFailed { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type TxResult<T> = Result<T, TxError>;

/// Statistics returned by a successful [`Transaction::commit`]
#[derive(Debug, Clone, PartialEq)]
pub struct TxReport {
    pub tx_id: Uuid,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub nodes_updated: usize,
    pub edges_updated: usize,
    pub nodes_deleted: usize,
    pub edges_deleted: usize,
}

/// Overlay of uncommitted writes
///
/// `None` marks a deletion. Entities in `created_*` were allocated by this
/// transaction and have no committed version.
#[derive(Debug, Default)]
pub(crate) struct TxState {
    pub(crate) nodes: HashMap<NodeId, Option<Node>>,
    pub(crate) edges: HashMap<EdgeId, Option<Edge>>,
    pub(crate) created_nodes: HashSet<NodeId>,
    pub(crate) created_edges: HashSet<EdgeId>,
}

impl TxState {
    fn node_live(&self, store: &GraphStore, id: NodeId) -> bool {
        match self.nodes.get(&id) {
            Some(entry) => entry.is_some(),
            None => store.has_node(id),
        }
    }

    /// Re-check the overlay against the store as it is at commit time
    ///
    /// Another transaction may have committed since this one read: edges it
    /// attached to a node we delete are deleted too, and writes to entities
    /// it deleted are rejected.
    pub(crate) fn validate(&mut self, store: &GraphStore) -> Result<(), GraphError> {
        let deleted_nodes: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, entry)| entry.is_none() && !self.created_nodes.contains(id))
            .map(|(id, _)| *id)
            .collect();
        for node_id in deleted_nodes {
            for edge_id in store.edges_of(node_id) {
                self.edges.insert(edge_id, None);
            }
        }

        for (id, entry) in &self.nodes {
            if entry.is_some() && !self.created_nodes.contains(id) && !store.has_node(*id) {
                return Err(GraphError::NodeNotFound(*id));
            }
        }
        for (id, entry) in &self.edges {
            let Some(edge) = entry else { continue };
            if !self.created_edges.contains(id) && !store.has_edge(*id) {
                return Err(GraphError::EdgeNotFound(*id));
            }
            if !self.node_live(store, edge.source) {
                return Err(GraphError::InvalidEdgeSource(edge.source));
            }
            if !self.node_live(store, edge.target) {
                return Err(GraphError::InvalidEdgeTarget(edge.target));
            }
        }
        Ok(())
    }

    /// Split the overlay into created, deleted and modified entity ids
    ///
    /// Entities created and deleted in the same transaction appear nowhere.
    /// Each list holds nodes first, then relationships, ordered by id.
    pub(crate) fn classify(&self, store: &GraphStore) -> (Vec<EntityId>, Vec<EntityId>, Vec<EntityId>) {
        let mut created = Vec::new();
        let mut deleted = Vec::new();
        let mut modified = Vec::new();

        let mut node_ids: Vec<&NodeId> = self.nodes.keys().collect();
        node_ids.sort();
        for id in node_ids {
            let entry = &self.nodes[id];
            let committed = store.get_node(*id);
            match (entry, self.created_nodes.contains(id)) {
                (Some(_), true) => created.push(EntityId::Node(*id)),
                (None, false) if committed.is_some() => deleted.push(EntityId::Node(*id)),
                (Some(node), false) => {
                    if committed.is_some_and(|c| c.properties != node.properties) {
                        modified.push(EntityId::Node(*id));
                    }
                }
                _ => {}
            }
        }

        let mut edge_ids: Vec<&EdgeId> = self.edges.keys().collect();
        edge_ids.sort();
        for id in edge_ids {
            let entry = &self.edges[id];
            let committed = store.get_edge(*id);
            match (entry, self.created_edges.contains(id)) {
                (Some(_), true) => created.push(EntityId::Relationship(*id)),
                (None, false) if committed.is_some() => deleted.push(EntityId::Relationship(*id)),
                (Some(edge), false) => {
                    if committed.is_some_and(|c| c.properties != edge.properties) {
                        modified.push(EntityId::Relationship(*id));
                    }
                }
                _ => {}
            }
        }

        (created, deleted, modified)
    }

    /// Net writes to hand to storage and the store
    pub(crate) fn to_change_set(&self, store: &GraphStore) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (id, entry) in &self.nodes {
            match entry {
                Some(node) => {
                    let changed = self.created_nodes.contains(id)
                        || store.get_node(*id).is_some_and(|c| c != node);
                    if changed {
                        changes.nodes.push(node.clone());
                    }
                }
                None if store.has_node(*id) => changes.deleted_nodes.push(*id),
                None => {}
            }
        }
        for (id, entry) in &self.edges {
            match entry {
                Some(edge) => {
                    let changed = self.created_edges.contains(id)
                        || store.get_edge(*id).is_some_and(|c| c != edge);
                    if changed {
                        changes.edges.push(edge.clone());
                    }
                }
                None if store.has_edge(*id) => changes.deleted_edges.push(*id),
                None => {}
            }
        }
        changes
    }
}

/// A unit of work against a [`GraphDatabase`]
///
/// Obtained via [`GraphDatabase::begin`].
pub struct Transaction<'a> {
    /// Unique ID for this transaction, passed to hooks
    pub tx_id: Uuid,
    db: &'a GraphDatabase,
    state: TxState,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(db: &'a GraphDatabase) -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            db,
            state: TxState::default(),
        }
    }

    /// Buffer a node creation
    pub fn create_node<L>(&mut self, labels: impl IntoIterator<Item = L>, properties: PropertyMap) -> NodeId
    where
        L: Into<Label>,
    {
        let id = self.db.allocate_node_id();
        let node = Node::new(id, labels.into_iter().map(Into::into), properties);
        self.state.created_nodes.insert(id);
        self.state.nodes.insert(id, Some(node));
        id
    }

    /// Buffer a relationship creation between two live nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> TxResult<EdgeId> {
        if self.node(source)?.is_none() {
            return Err(GraphError::InvalidEdgeSource(source).into());
        }
        if self.node(target)?.is_none() {
            return Err(GraphError::InvalidEdgeTarget(target).into());
        }

        let id = self.db.allocate_edge_id();
        let edge = Edge::new(id, source, target, edge_type, properties);
        self.state.created_edges.insert(id);
        self.state.edges.insert(id, Some(edge));
        Ok(id)
    }

    /// Read a node as this transaction sees it
    pub fn node(&self, id: NodeId) -> TxResult<Option<Node>> {
        match self.state.nodes.get(&id) {
            Some(entry) => Ok(entry.clone()),
            None => Ok(self.db.read_store()?.get_node(id).cloned()),
        }
    }

    /// Read an edge as this transaction sees it
    pub fn edge(&self, id: EdgeId) -> TxResult<Option<Edge>> {
        match self.state.edges.get(&id) {
            Some(entry) => Ok(entry.clone()),
            None => Ok(self.db.read_store()?.get_edge(id).cloned()),
        }
    }

    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TxResult<Option<PropertyValue>> {
        Ok(self.node_mut(id)?.set_property(key, value))
    }

    pub fn remove_node_property(&mut self, id: NodeId, key: &str) -> TxResult<Option<PropertyValue>> {
        Ok(self.node_mut(id)?.remove_property(key))
    }

    pub fn set_edge_property(
        &mut self,
        id: EdgeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> TxResult<Option<PropertyValue>> {
        Ok(self.edge_mut(id)?.set_property(key, value))
    }

    pub fn remove_edge_property(&mut self, id: EdgeId, key: &str) -> TxResult<Option<PropertyValue>> {
        Ok(self.edge_mut(id)?.remove_property(key))
    }

    /// Buffer deletion of a node and every relationship attached to it
    pub fn delete_node(&mut self, id: NodeId) -> TxResult<()> {
        if self.node(id)?.is_none() {
            return Err(GraphError::NodeNotFound(id).into());
        }

        let mut attached: HashSet<EdgeId> = self.db.read_store()?.edges_of(id).into_iter().collect();
        attached.extend(
            self.state
                .edges
                .iter()
                .filter(|(_, entry)| entry.as_ref().is_some_and(|e| e.touches(id)))
                .map(|(edge_id, _)| *edge_id),
        );
        for edge_id in attached {
            self.state.edges.insert(edge_id, None);
        }

        self.state.nodes.insert(id, None);
        Ok(())
    }

    /// Buffer deletion of a relationship
    pub fn delete_edge(&mut self, id: EdgeId) -> TxResult<()> {
        if self.edge(id)?.is_none() {
            return Err(GraphError::EdgeNotFound(id).into());
        }
        self.state.edges.insert(id, None);
        Ok(())
    }

    /// Run hooks and apply all buffered writes atomically
    pub fn commit(self) -> TxResult<TxReport> {
        self.db.commit(self.tx_id, self.state)
    }

    /// Discard all buffered writes
    pub fn rollback(self) {
        debug!("Transaction {} rolled back by caller", self.tx_id);
    }

    fn node_mut(&mut self, id: NodeId) -> TxResult<&mut Node> {
        if !self.state.nodes.contains_key(&id) {
            let committed = self.db.read_store()?.get_node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;
            self.state.nodes.insert(id, Some(committed));
        }
        self.state
            .nodes
            .get_mut(&id)
            .and_then(Option::as_mut)
            .ok_or(TxError::Graph(GraphError::NodeNotFound(id)))
    }

    fn edge_mut(&mut self, id: EdgeId) -> TxResult<&mut Edge> {
        if !self.state.edges.contains_key(&id) {
            let committed = self.db.read_store()?.get_edge(id).cloned().ok_or(GraphError::EdgeNotFound(id))?;
            self.state.edges.insert(id, Some(committed));
        }
        self.state
            .edges
            .get_mut(&id)
            .and_then(Option::as_mut)
            .ok_or(TxError::Graph(GraphError::EdgeNotFound(id)))
    }
}
