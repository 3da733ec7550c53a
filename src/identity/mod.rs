//! UUID identity module
//!
//! A [`UuidModule`] is a transaction hook that gives every tracked node and
//! relationship a `uuid` property and `createdAt`/`updatedAt` timestamps,
//! keeps UUIDs unique per entity kind, and answers lookups by UUID.
//!
//! ```text
//! before_commit ──► TransactionInterceptor ──► IdentifierAssigner
//!       │                    │                 TimestampAssigner
//!       │                    ▼
//!       │              IndexDelta (staged per tx_id)
//!       ▼
//! after_commit  ──► UuidIndex::apply          after_rollback ──► discard
//! ```
//!
//! Several named instances can run side by side; [`ModuleRegistry`] maps
//! names to instances and [`LookupService`] resolves UUIDs through it.

pub mod assigner;
pub mod config;
pub mod error;
pub mod generator;
pub mod index;
pub mod interceptor;
pub mod registry;
pub mod timestamp;

pub use assigner::{ExistingUuid, IdentifierAssigner};
pub use config::{ModuleConfig, TimestampConfig, TrackedKinds, DEFAULT_MODULE_NAME};
pub use error::{UuidError, UuidResult};
pub use generator::{Clock, RandomUuidGenerator, SystemClock, UuidGenerator};
pub use index::{IndexDelta, UuidIndex};
pub use interceptor::TransactionInterceptor;
pub use registry::{LookupError, LookupService, ModuleRegistry, RegistryError};
pub use timestamp::TimestampAssigner;

use crate::graph::{
    EntityId, EntityKind, GraphDatabase, GraphStore, HookResult, TransactionData, TransactionHook, TxResult,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct UuidModule {
    interceptor: TransactionInterceptor,
    index: UuidIndex,
    /// Index changes of transactions between `before_commit` and their outcome
    pending: DashMap<Uuid, IndexDelta>,
}

impl UuidModule {
    /// Module with random v4 UUIDs and the system clock
    pub fn new(config: ModuleConfig) -> Self {
        let generator: Arc<dyn UuidGenerator> = if config.strip_hyphens {
            Arc::new(RandomUuidGenerator::without_hyphens())
        } else {
            Arc::new(RandomUuidGenerator::new())
        };
        Self::with_components(config, generator, Arc::new(SystemClock))
    }

    pub fn with_components(config: ModuleConfig, generator: Arc<dyn UuidGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            interceptor: TransactionInterceptor::new(config, generator, clock),
            index: UuidIndex::new(),
            pending: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config().name
    }

    pub fn config(&self) -> &ModuleConfig {
        self.interceptor.config()
    }

    pub fn index(&self) -> &UuidIndex {
        &self.index
    }

    pub fn tracks(&self, kind: EntityKind) -> bool {
        self.config().tracks(kind)
    }

    /// Entity currently holding `uuid`, if this module tracks `kind`
    pub fn lookup(&self, kind: EntityKind, uuid: &str) -> Option<EntityId> {
        if !self.tracks(kind) {
            return None;
        }
        self.index.get(kind, uuid)
    }

    /// Register with `db` and backfill if configured; returns the number of
    /// entities that were given a UUID by the backfill
    pub fn install(self: &Arc<Self>, db: &GraphDatabase) -> TxResult<usize> {
        db.register_hook(Arc::clone(self) as Arc<dyn TransactionHook>)?;
        if self.config().backfill {
            self.backfill(db)
        } else {
            Ok(0)
        }
    }

    /// Give a UUID to every tracked entity that has none, in one transaction
    ///
    /// The module must already be registered so the new UUIDs are checked
    /// and indexed by the normal commit path.
    pub fn backfill(&self, db: &GraphDatabase) -> TxResult<usize> {
        let config = self.config();
        let property = config.uuid_property.as_str();
        let targets: Vec<EntityId> = db.read(|store| {
            let nodes = store
                .all_nodes()
                .filter(|n| config.tracks_node(n) && n.get_property(property).is_none())
                .map(|n| EntityId::Node(n.id));
            let edges = store
                .all_edges()
                .filter(|e| config.tracks_edge(e) && e.get_property(property).is_none())
                .map(|e| EntityId::Relationship(e.id));
            nodes.chain(edges).collect()
        })?;

        if targets.is_empty() {
            return Ok(0);
        }

        let mut tx = db.begin();
        for id in &targets {
            let uuid = self.interceptor.assigner().generate();
            match *id {
                EntityId::Node(n) => tx.set_node_property(n, property, uuid)?,
                EntityId::Relationship(e) => tx.set_edge_property(e, property, uuid)?,
            };
        }
        tx.commit()?;
        info!("Module '{}' backfilled {} entities", self.name(), targets.len());
        Ok(targets.len())
    }
}

impl TransactionHook for UuidModule {
    fn name(&self) -> &str {
        &self.config().name
    }

    fn initialize(&self, store: &GraphStore) -> HookResult<()> {
        self.index.rebuild(store, self.config())?;
        info!(
            "Module '{}' indexed {} nodes and {} relationships",
            self.name(),
            self.index.len(EntityKind::Node),
            self.index.len(EntityKind::Relationship)
        );
        Ok(())
    }

    fn before_commit(&self, data: &mut TransactionData<'_>) -> HookResult<()> {
        let delta = self.interceptor.intercept(data, &self.index)?;
        if !delta.is_empty() {
            self.pending.insert(data.tx_id(), delta);
        }
        Ok(())
    }

    fn after_commit(&self, tx_id: Uuid) {
        if let Some((_, delta)) = self.pending.remove(&tx_id) {
            self.index.apply(&delta);
        }
    }

    fn after_rollback(&self, tx_id: Uuid) {
        if self.pending.remove(&tx_id).is_some() {
            debug!("Module '{}' discarded index changes of {}", self.name(), tx_id);
        }
    }
}
