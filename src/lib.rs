//! Samyama UUID
//!
//! Automatic UUIDs and creation/update timestamps for the nodes and
//! relationships of a property graph, with uniqueness enforced per entity
//! kind and lookups by UUID over HTTP.
//!
//! # Architecture
//!
//! - `graph`: minimal host graph with buffered transactions and pre-commit hooks
//! - `persistence`: RocksDB durability and recovery of the host graph
//! - `identity`: the UUID module (interceptor, assigners, index, lookup)
//! - `config` / `runtime`: YAML configuration wired into a running database
//! - `http`: axum router for `/uuid/...` lookups and the read-only entity view
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_uuid::graph::{props, GraphDatabase, PropertyMap};
//! use samyama_uuid::identity::{ModuleConfig, UuidModule};
//! use samyama_uuid::EntityKind;
//! use std::sync::Arc;
//!
//! let db = GraphDatabase::in_memory();
//! let uidm = Arc::new(UuidModule::new(ModuleConfig::default()));
//! uidm.install(&db).unwrap();
//!
//! let mut tx = db.begin();
//! let alice = tx.create_node(["Person"], props([("name", "Alice")]));
//! let bob = tx.create_node(["Person"], PropertyMap::new());
//! tx.create_edge(alice, bob, "KNOWS", PropertyMap::new()).unwrap();
//! tx.commit().unwrap();
//!
//! let node = db.node(alice).unwrap().unwrap();
//! let uuid = node.get_property("uuid").unwrap().as_string().unwrap();
//! assert_eq!(uidm.lookup(EntityKind::Node, uuid).unwrap().as_u64(), alice.as_u64());
//! assert_eq!(node.get_property("createdAt"), node.get_property("updatedAt"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod http;
pub mod identity;
pub mod persistence;
pub mod runtime;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeId, EdgeType, EntityId, EntityKind, GraphDatabase, GraphError, GraphResult, GraphStore, Label, Node,
    NodeId, PropertyMap, PropertyValue, Transaction, TransactionHook, TxError, TxReport,
};

pub use identity::{
    Clock, LookupError, LookupService, ModuleConfig, ModuleRegistry, RandomUuidGenerator, SystemClock, TrackedKinds,
    UuidError, UuidGenerator, UuidModule, DEFAULT_MODULE_NAME,
};

pub use persistence::{PersistentStorage, StorageError, StorageResult};

pub use config::{Config, ConfigError, ServerConfig};
pub use runtime::{RuntimeError, UuidRuntime};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
