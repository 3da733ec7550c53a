//! RocksDB storage layer
//!
//! Nodes and edges live in their own column families, keyed by big-endian
//! id so a full scan returns them in id order. A committed transaction is
//! written as a single `WriteBatch`.

use crate::graph::{ChangeSet, Edge, EdgeId, EdgeType, Label, Node, NodeId, PropertyMap};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const CF_NODES: &str = "nodes";
const CF_EDGES: &str = "edges";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Persisted data that cannot be loaded back
    #[error("Corrupt storage: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Serialized node for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    id: u64,
    labels: Vec<String>,
    properties: Vec<u8>, // Serialized PropertyMap
}

/// Serialized edge for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEdge {
    id: u64,
    source: u64,
    target: u64,
    edge_type: String,
    properties: Vec<u8>, // Serialized PropertyMap
}

impl StoredNode {
    fn encode(node: &Node) -> StorageResult<Vec<u8>> {
        let stored = StoredNode {
            id: node.id.as_u64(),
            labels: node.sorted_labels().iter().map(|l| l.as_str().to_string()).collect(),
            properties: bincode::serialize(&node.properties)?,
        };
        Ok(bincode::serialize(&stored)?)
    }

    fn decode(bytes: &[u8]) -> StorageResult<Node> {
        let stored: StoredNode = bincode::deserialize(bytes)?;
        let properties: PropertyMap = bincode::deserialize(&stored.properties)?;
        Ok(Node::new(
            NodeId::new(stored.id),
            stored.labels.into_iter().map(Label::new),
            properties,
        ))
    }
}

impl StoredEdge {
    fn encode(edge: &Edge) -> StorageResult<Vec<u8>> {
        let stored = StoredEdge {
            id: edge.id.as_u64(),
            source: edge.source.as_u64(),
            target: edge.target.as_u64(),
            edge_type: edge.edge_type.as_str().to_string(),
            properties: bincode::serialize(&edge.properties)?,
        };
        Ok(bincode::serialize(&stored)?)
    }

    fn decode(bytes: &[u8]) -> StorageResult<Edge> {
        let stored: StoredEdge = bincode::deserialize(bytes)?;
        let properties: PropertyMap = bincode::deserialize(&stored.properties)?;
        Ok(Edge::new(
            EdgeId::new(stored.id),
            NodeId::new(stored.source),
            NodeId::new(stored.target),
            EdgeType::new(stored.edge_type),
            properties,
        ))
    }
}

/// RocksDB-based persistent storage
pub struct PersistentStorage {
    db: DB,
}

impl PersistentStorage {
    /// Open or create a new persistent storage
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        info!("Opening persistent storage at: {:?}", path.as_ref());

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_NODES, Self::cf_options()),
            ColumnFamilyDescriptor::new(CF_EDGES, Self::cf_options()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db })
    }

    fn cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf(&self, name: &str) -> StorageResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    /// Write one committed change set atomically
    pub fn apply(&self, changes: &ChangeSet) -> StorageResult<()> {
        let nodes = self.cf(CF_NODES)?;
        let edges = self.cf(CF_EDGES)?;

        let mut batch = WriteBatch::default();
        for id in &changes.deleted_edges {
            batch.delete_cf(edges, Self::key(id.as_u64()));
        }
        for id in &changes.deleted_nodes {
            batch.delete_cf(nodes, Self::key(id.as_u64()));
        }
        for node in &changes.nodes {
            batch.put_cf(nodes, Self::key(node.id.as_u64()), StoredNode::encode(node)?);
        }
        for edge in &changes.edges {
            batch.put_cf(edges, Self::key(edge.id.as_u64()), StoredEdge::encode(edge)?);
        }

        self.db.write(batch)?;
        debug!(
            "Persisted {} nodes, {} edges, {} node deletions, {} edge deletions",
            changes.nodes.len(),
            changes.edges.len(),
            changes.deleted_nodes.len(),
            changes.deleted_edges.len()
        );
        Ok(())
    }

    /// Get all nodes (for recovery)
    pub fn scan_nodes(&self) -> StorageResult<Vec<Node>> {
        let mut nodes = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_NODES)?, IteratorMode::Start) {
            let (_key, value) = item?;
            nodes.push(StoredNode::decode(&value)?);
        }
        Ok(nodes)
    }

    /// Get all edges (for recovery)
    pub fn scan_edges(&self) -> StorageResult<Vec<Edge>> {
        let mut edges = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_EDGES)?, IteratorMode::Start) {
            let (_key, value) = item?;
            edges.push(StoredEdge::decode(&value)?);
        }
        Ok(edges)
    }

    fn key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;
    use tempfile::TempDir;

    fn person(id: u64, name: &str) -> Node {
        Node::new(NodeId::new(id), vec![Label::new("Person")], props([("name", name)]))
    }

    #[test]
    fn test_apply_and_scan() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();

        let edge = Edge::new(EdgeId::new(0), NodeId::new(1), NodeId::new(2), "FRIEND_OF", props([("uuid", "r-1")]));
        storage
            .apply(&ChangeSet {
                nodes: vec![person(1, "Luanne"), person(2, "Michal")],
                edges: vec![edge.clone()],
                ..Default::default()
            })
            .unwrap();

        let nodes = storage.scan_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].get_property("name").unwrap().as_string(), Some("Luanne"));
        assert!(nodes[0].has_label(&Label::new("Person")));
        assert_eq!(storage.scan_edges().unwrap(), vec![edge]);
    }

    #[test]
    fn test_deletions_in_batch() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open(temp_dir.path()).unwrap();

        storage
            .apply(&ChangeSet { nodes: vec![person(1, "a"), person(2, "b")], ..Default::default() })
            .unwrap();
        storage
            .apply(&ChangeSet { deleted_nodes: vec![NodeId::new(1)], ..Default::default() })
            .unwrap();

        let ids: Vec<u64> = storage.scan_nodes().unwrap().iter().map(|n| n.id.as_u64()).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_scan_in_id_order() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = PersistentStorage::open(temp_dir.path()).unwrap();
            let nodes = [300u64, 2, 17].iter().map(|i| person(*i, "x")).collect();
            storage.apply(&ChangeSet { nodes, ..Default::default() }).unwrap();
        }

        let storage = PersistentStorage::open(temp_dir.path()).unwrap();
        let ids: Vec<u64> = storage.scan_nodes().unwrap().iter().map(|n| n.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 17, 300]);
        assert!(storage.scan_edges().unwrap().is_empty());
    }
}
