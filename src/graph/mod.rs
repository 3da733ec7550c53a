//! Minimal host property graph
//!
//! This module implements the write path the UUID module plugs into:
//! - Nodes with labels and properties, directed typed relationships
//! - Buffered transactions with an atomic commit
//! - Pre-commit hooks that can amend or veto a transaction
//! - Optional RocksDB durability with recovery on open

pub mod database;
pub mod edge;
pub mod hook;
pub mod node;
pub mod property;
pub mod store;
pub mod transaction;
pub mod types;

// Re-export main types
pub use database::GraphDatabase;
pub use edge::Edge;
pub use hook::{HookError, HookResult, TransactionData, TransactionHook};
pub use node::Node;
pub use property::{props, PropertyMap, PropertyValue};
pub use store::{ChangeSet, GraphError, GraphResult, GraphStore};
pub use transaction::{Transaction, TxError, TxReport, TxResult};
pub use types::{EdgeId, EdgeType, EntityId, EntityKind, Label, NodeId};
