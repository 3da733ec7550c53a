//! Host database: committed store, id allocation, hooks and commit protocol
//!
//! ## Commit protocol
//!
//! ```text
//! 1. write-lock the store            (serializes commits)
//! 2. validate the overlay            (entities still exist, endpoints live)
//! 3. hook.before_commit(...)         (each hook may amend or veto)
//! 4. persist the change set          (one RocksDB write batch, if durable)
//! 5. apply the change set to memory
//! 6. hook.after_commit(tx_id)
//! ```
//!
//! A failure in steps 2–4 leaves the store untouched; hooks that already
//! ran get `after_rollback`.

use super::edge::Edge;
use super::hook::{TransactionData, TransactionHook};
use super::node::Node;
use super::store::GraphStore;
use super::transaction::{Transaction, TxError, TxReport, TxResult, TxState};
use super::types::{EdgeId, EntityId, EntityKind, NodeId};
use crate::persistence::{PersistentStorage, StorageError, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct GraphDatabase {
    store: RwLock<GraphStore>,
    hooks: RwLock<Vec<Arc<dyn TransactionHook>>>,
    /// When Some, every commit is written to RocksDB before it is applied
    storage: Option<PersistentStorage>,
    next_node_id: AtomicU64,
    next_edge_id: AtomicU64,
}

impl GraphDatabase {
    /// Create an empty, non-durable database
    pub fn in_memory() -> Self {
        Self::with_store(GraphStore::new(), None)
    }

    /// Open (or create) a durable database and recover its committed state
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let storage = PersistentStorage::open(path)?;

        let mut store = GraphStore::new();
        for node in storage.scan_nodes()? {
            store.insert_recovered_node(node);
        }
        for edge in storage.scan_edges()? {
            store
                .insert_recovered_edge(edge)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        }
        info!(
            "Recovered {} nodes and {} edges from storage",
            store.node_count(),
            store.edge_count()
        );

        Ok(Self::with_store(store, Some(storage)))
    }

    fn with_store(store: GraphStore, storage: Option<PersistentStorage>) -> Self {
        let next_node_id = store.max_node_id().map_or(0, |id| id + 1);
        let next_edge_id = store.max_edge_id().map_or(0, |id| id + 1);
        Self {
            store: RwLock::new(store),
            hooks: RwLock::new(Vec::new()),
            storage,
            next_node_id: AtomicU64::new(next_node_id),
            next_edge_id: AtomicU64::new(next_edge_id),
        }
    }

    /// Whether commits are written to disk
    pub fn is_durable(&self) -> bool {
        self.storage.is_some()
    }

    /// Start a new transaction
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Register a hook for every subsequent commit
    ///
    /// The hook's `initialize` runs with the store write-locked, so no commit
    /// can slip in between its rebuild and its first `before_commit`.
    pub fn register_hook(&self, hook: Arc<dyn TransactionHook>) -> TxResult<()> {
        let store = self.write_store()?;
        hook.initialize(&store).map_err(|source| TxError::HookFailed {
            hook: hook.name().to_string(),
            source,
        })?;
        self.hooks.write().map_err(|_| TxError::LockPoisoned)?.push(Arc::clone(&hook));
        info!("Registered transaction hook '{}'", hook.name());
        Ok(())
    }

    /// Run a closure against the committed store
    pub fn read<R>(&self, f: impl FnOnce(&GraphStore) -> R) -> TxResult<R> {
        let store = self.read_store()?;
        Ok(f(&store))
    }

    pub fn node(&self, id: NodeId) -> TxResult<Option<Node>> {
        self.read(|store| store.get_node(id).cloned())
    }

    pub fn edge(&self, id: EdgeId) -> TxResult<Option<Edge>> {
        self.read(|store| store.get_edge(id).cloned())
    }

    pub fn node_count(&self) -> TxResult<usize> {
        self.read(GraphStore::node_count)
    }

    pub fn edge_count(&self) -> TxResult<usize> {
        self.read(GraphStore::edge_count)
    }

    pub(crate) fn allocate_node_id(&self) -> NodeId {
        NodeId::new(self.next_node_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn allocate_edge_id(&self) -> EdgeId {
        EdgeId::new(self.next_edge_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn read_store(&self) -> TxResult<RwLockReadGuard<'_, GraphStore>> {
        self.store.read().map_err(|_| TxError::LockPoisoned)
    }

    fn write_store(&self) -> TxResult<RwLockWriteGuard<'_, GraphStore>> {
        self.store.write().map_err(|_| TxError::LockPoisoned)
    }

    pub(crate) fn commit(&self, tx_id: Uuid, mut state: TxState) -> TxResult<TxReport> {
        let mut store = self.write_store()?;
        state.validate(&store)?;

        let hooks: Vec<Arc<dyn TransactionHook>> = self.hooks.read().map_err(|_| TxError::LockPoisoned)?.clone();

        {
            let mut data = TransactionData::new(tx_id, &store, &mut state);
            for (ran, hook) in hooks.iter().enumerate() {
                if let Err(source) = hook.before_commit(&mut data) {
                    warn!("Transaction {} vetoed by hook '{}': {}", tx_id, hook.name(), source);
                    for h in &hooks[..=ran] {
                        h.after_rollback(tx_id);
                    }
                    return Err(TxError::HookFailed {
                        hook: hook.name().to_string(),
                        source,
                    });
                }
            }
        }

        let (created, deleted, modified) = state.classify(&store);
        let changes = state.to_change_set(&store);

        if let Some(storage) = &self.storage {
            if !changes.is_empty() {
                if let Err(e) = storage.apply(&changes) {
                    warn!("Transaction {} failed to persist: {}", tx_id, e);
                    for h in &hooks {
                        h.after_rollback(tx_id);
                    }
                    return Err(e.into());
                }
            }
        }

        store.apply(&changes);
        for hook in &hooks {
            hook.after_commit(tx_id);
        }

        let count = |ids: &[EntityId], kind: EntityKind| ids.iter().filter(|id| id.kind() == kind).count();
        let report = TxReport {
            tx_id,
            nodes_created: count(&created, EntityKind::Node),
            edges_created: count(&created, EntityKind::Relationship),
            nodes_updated: count(&modified, EntityKind::Node),
            edges_updated: count(&modified, EntityKind::Relationship),
            nodes_deleted: count(&deleted, EntityKind::Node),
            edges_deleted: count(&deleted, EntityKind::Relationship),
        };
        debug!("Committed transaction {:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::hook::HookResult;
    use crate::graph::property::{props, PropertyMap};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records what it saw and stamps a marker on created entities
    #[derive(Default)]
    struct RecordingHook {
        seen: Mutex<Vec<(Vec<EntityId>, Vec<EntityId>, Vec<EntityId>)>>,
        committed: Mutex<Vec<Uuid>>,
        rolled_back: Mutex<Vec<Uuid>>,
        veto: bool,
    }

    impl TransactionHook for RecordingHook {
        fn name(&self) -> &str {
            "recorder"
        }

        fn before_commit(&self, data: &mut TransactionData<'_>) -> HookResult<()> {
            self.seen.lock().unwrap().push((
                data.created().to_vec(),
                data.deleted().to_vec(),
                data.modified().to_vec(),
            ));
            for id in data.created().to_vec() {
                data.set_property(id, "stamped", true)?;
            }
            if self.veto {
                return Err("vetoed".into());
            }
            Ok(())
        }

        fn after_commit(&self, tx_id: Uuid) {
            self.committed.lock().unwrap().push(tx_id);
        }

        fn after_rollback(&self, tx_id: Uuid) {
            self.rolled_back.lock().unwrap().push(tx_id);
        }
    }

    #[test]
    fn test_hook_sees_changes_and_amends_commit() {
        let db = GraphDatabase::in_memory();
        let hook = Arc::new(RecordingHook::default());
        db.register_hook(hook.clone()).unwrap();

        let mut tx = db.begin();
        let a = tx.create_node(["Person"], PropertyMap::new());
        let b = tx.create_node(["Person"], PropertyMap::new());
        let e = tx.create_edge(a, b, "KNOWS", PropertyMap::new()).unwrap();
        let tx_id = tx.tx_id;
        tx.commit().unwrap();

        let seen = hook.seen.lock().unwrap().clone();
        assert_eq!(seen[0].0, vec![EntityId::Node(a), EntityId::Node(b), EntityId::Relationship(e)]);
        assert!(db.node(a).unwrap().unwrap().get_property("stamped").is_some());
        assert!(db.edge(e).unwrap().unwrap().get_property("stamped").is_some());
        assert_eq!(hook.committed.lock().unwrap().as_slice(), &[tx_id]);

        let mut tx = db.begin();
        tx.set_node_property(a, "name", "Luanne").unwrap();
        tx.delete_node(b).unwrap();
        tx.commit().unwrap();

        let seen = hook.seen.lock().unwrap().clone();
        assert_eq!(seen[1].0, vec![]);
        assert_eq!(seen[1].1, vec![EntityId::Node(b), EntityId::Relationship(e)]);
        assert_eq!(seen[1].2, vec![EntityId::Node(a)]);
    }

    #[test]
    fn test_vetoing_hook_rolls_back_everything() {
        let db = GraphDatabase::in_memory();
        let hook = Arc::new(RecordingHook { veto: true, ..Default::default() });
        db.register_hook(hook.clone()).unwrap();

        let mut tx = db.begin();
        tx.create_node(["Person"], props([("name", "Luanne")]));
        let tx_id = tx.tx_id;
        let err = tx.commit().unwrap_err();

        assert!(err.is_hook_failure());
        assert!(err.to_string().contains("recorder"));
        assert_eq!(db.node_count().unwrap(), 0);
        assert_eq!(hook.rolled_back.lock().unwrap().as_slice(), &[tx_id]);
        assert!(hook.committed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_durable_database_recovers_state_and_id_counters() {
        let dir = TempDir::new().unwrap();
        let (a, e) = {
            let db = GraphDatabase::open(dir.path()).unwrap();
            assert!(db.is_durable());
            let mut tx = db.begin();
            let a = tx.create_node(["Person"], props([("name", "Luanne")]));
            let b = tx.create_node(["Person"], PropertyMap::new());
            let e = tx.create_edge(a, b, "FRIEND_OF", PropertyMap::new()).unwrap();
            tx.commit().unwrap();
            (a, e)
        };

        let db = GraphDatabase::open(dir.path()).unwrap();
        assert_eq!(db.node_count().unwrap(), 2);
        assert_eq!(db.edge(e).unwrap().unwrap().edge_type.as_str(), "FRIEND_OF");
        assert_eq!(db.node(a).unwrap().unwrap().get_property("name").unwrap().as_string(), Some("Luanne"));

        let mut tx = db.begin();
        let c = tx.create_node(["Person"], PropertyMap::new());
        assert_eq!(c, NodeId::new(2));
        tx.rollback();
    }
}
