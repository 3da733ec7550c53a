//! Persistence layer
//!
//! Committed transactions are written to RocksDB before they become visible
//! in memory; on restart the graph is recovered from it and every UUID
//! module rebuilds its index from the recovered `uuid` properties.

pub mod storage;

pub use storage::{PersistentStorage, StorageError, StorageResult};
