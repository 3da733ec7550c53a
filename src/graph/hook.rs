//! Pre-commit transaction hooks
//!
//! A hook sees the net effect of a transaction right before it is applied:
//! which entities were created, deleted and modified. It may write
//! properties on created or modified entities (those writes are folded into
//! the same commit) and it may veto the whole transaction by returning an
//! error from [`TransactionHook::before_commit`].

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::store::{GraphError, GraphResult, GraphStore};
use super::transaction::TxState;
use super::types::{EdgeId, EntityId, NodeId};
use uuid::Uuid;

/// Error a hook uses to veto a transaction
///
/// Boxed so the host stays agnostic of each hook's own error type; callers
/// recover the concrete error with `downcast_ref`.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult<T> = Result<T, HookError>;

/// Callback run by the database around every commit
pub trait TransactionHook: Send + Sync {
    /// Name used in logs and in [`TxError::HookFailed`](super::TxError::HookFailed)
    fn name(&self) -> &str;

    /// Called once at registration, with the store write-locked, so derived
    /// state can be rebuilt before the hook sees any transaction.
    fn initialize(&self, _store: &GraphStore) -> HookResult<()> {
        Ok(())
    }

    /// Inspect, amend or veto a transaction before it commits
    fn before_commit(&self, data: &mut TransactionData<'_>) -> HookResult<()>;

    /// The transaction whose `before_commit` succeeded is now visible
    fn after_commit(&self, _tx_id: Uuid) {}

    /// The transaction was rejected after `before_commit` ran
    fn after_rollback(&self, _tx_id: Uuid) {}
}

/// View of a committing transaction handed to hooks
pub struct TransactionData<'a> {
    tx_id: Uuid,
    store: &'a GraphStore,
    state: &'a mut TxState,
    created: Vec<EntityId>,
    deleted: Vec<EntityId>,
    modified: Vec<EntityId>,
}

impl<'a> TransactionData<'a> {
    pub(crate) fn new(tx_id: Uuid, store: &'a GraphStore, state: &'a mut TxState) -> Self {
        let (created, deleted, modified) = state.classify(store);
        Self {
            tx_id,
            store,
            state,
            created,
            deleted,
            modified,
        }
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    /// Entities created by this transaction (and not deleted again)
    pub fn created(&self) -> &[EntityId] {
        &self.created
    }

    /// Previously committed entities this transaction deletes
    pub fn deleted(&self) -> &[EntityId] {
        &self.deleted
    }

    /// Previously committed entities whose properties this transaction changes
    pub fn modified(&self) -> &[EntityId] {
        &self.modified
    }

    /// Node as it will be committed, or as last committed if untouched
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        match self.state.nodes.get(&id) {
            Some(entry) => entry.as_ref(),
            None => self.store.get_node(id),
        }
    }

    /// Edge as it will be committed, or as last committed if untouched
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        match self.state.edges.get(&id) {
            Some(entry) => entry.as_ref(),
            None => self.store.get_edge(id),
        }
    }

    /// Properties as they will be committed
    pub fn properties(&self, id: EntityId) -> Option<&PropertyMap> {
        match id {
            EntityId::Node(id) => self.node(id).map(|n| &n.properties),
            EntityId::Relationship(id) => self.edge(id).map(|e| &e.properties),
        }
    }

    /// Properties as last committed; `None` for entities created here
    pub fn previous_properties(&self, id: EntityId) -> Option<&PropertyMap> {
        match id {
            EntityId::Node(id) => self.store.get_node(id).map(|n| &n.properties),
            EntityId::Relationship(id) => self.store.get_edge(id).map(|e| &e.properties),
        }
    }

    /// Write a property into the committing transaction
    pub fn set_property(
        &mut self,
        id: EntityId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        Ok(self.properties_mut(id)?.insert(key.into(), value.into()))
    }

    fn properties_mut(&mut self, id: EntityId) -> GraphResult<&mut PropertyMap> {
        match id {
            EntityId::Node(node_id) => {
                if !self.state.nodes.contains_key(&node_id) {
                    let committed = self.store.get_node(node_id).cloned().ok_or(GraphError::NodeNotFound(node_id))?;
                    self.state.nodes.insert(node_id, Some(committed));
                }
                self.state
                    .nodes
                    .get_mut(&node_id)
                    .and_then(Option::as_mut)
                    .map(|n| &mut n.properties)
                    .ok_or(GraphError::NodeNotFound(node_id))
            }
            EntityId::Relationship(edge_id) => {
                if !self.state.edges.contains_key(&edge_id) {
                    let committed = self.store.get_edge(edge_id).cloned().ok_or(GraphError::EdgeNotFound(edge_id))?;
                    self.state.edges.insert(edge_id, Some(committed));
                }
                self.state
                    .edges
                    .get_mut(&edge_id)
                    .and_then(Option::as_mut)
                    .map(|e| &mut e.properties)
                    .ok_or(GraphError::EdgeNotFound(edge_id))
            }
        }
    }
}
