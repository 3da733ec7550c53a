//! Live UUID → entity index, one map per entity kind
//!
//! Writes to the index are staged per transaction in an [`IndexDelta`] and
//! only applied once the host reports the commit. Reads go straight to the
//! sharded maps and never touch the graph store lock.

use super::config::ModuleConfig;
use super::error::{UuidError, UuidResult};
use crate::graph::{EntityId, EntityKind, GraphStore};
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct UuidIndex {
    nodes: DashMap<String, EntityId>,
    relationships: DashMap<String, EntityId>,
}

impl UuidIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: EntityKind) -> &DashMap<String, EntityId> {
        match kind {
            EntityKind::Node => &self.nodes,
            EntityKind::Relationship => &self.relationships,
        }
    }

    pub fn get(&self, kind: EntityKind, uuid: &str) -> Option<EntityId> {
        self.map(kind).get(uuid).map(|entry| *entry.value())
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.map(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }

    /// Publish a committed delta: removals first so a UUID released and
    /// reclaimed in one transaction ends up pointing at the new owner
    pub fn apply(&self, delta: &IndexDelta) {
        for ((kind, uuid), id) in &delta.removals {
            self.map(*kind).remove_if(uuid, |_, owner| owner == id);
        }
        for ((kind, uuid), id) in &delta.inserts {
            self.map(*kind).insert(uuid.clone(), *id);
        }
    }

    /// Replace the contents with the UUIDs stored on every tracked entity
    pub fn rebuild(&self, store: &GraphStore, config: &ModuleConfig) -> UuidResult<()> {
        self.nodes.clear();
        self.relationships.clear();

        let nodes = store
            .all_nodes()
            .filter(|n| config.tracks_node(n))
            .map(|n| (EntityId::Node(n.id), n.get_property(&config.uuid_property)));
        let edges = store
            .all_edges()
            .filter(|e| config.tracks_edge(e))
            .map(|e| (EntityId::Relationship(e.id), e.get_property(&config.uuid_property)));

        for (id, value) in nodes.chain(edges) {
            let Some(uuid) = value.and_then(|v| v.as_string()) else {
                continue;
            };
            let map = self.map(id.kind());
            if map.contains_key(uuid) {
                return Err(UuidError::DuplicateUuid {
                    kind: id.kind(),
                    uuid: uuid.to_string(),
                });
            }
            map.insert(uuid.to_string(), id);
        }
        Ok(())
    }
}

/// Index changes made by one transaction, not yet visible
#[derive(Debug, Default, Clone)]
pub struct IndexDelta {
    inserts: HashMap<(EntityKind, String), EntityId>,
    removals: HashMap<(EntityKind, String), EntityId>,
}

impl IndexDelta {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.removals.is_empty()
    }

    /// Release `uuid` held by an entity this transaction deletes
    pub fn release(&mut self, uuid: impl Into<String>, id: EntityId) {
        self.removals.insert((id.kind(), uuid.into()), id);
    }

    /// Claim `uuid` for `id`, failing if another live entity of the same kind
    /// holds it in the index or already claimed it in this transaction
    pub fn claim(&mut self, index: &UuidIndex, uuid: &str, id: EntityId) -> UuidResult<()> {
        let key = (id.kind(), uuid.to_string());
        let conflict = match self.inserts.get(&key) {
            Some(owner) => *owner != id,
            None => match index.get(id.kind(), uuid) {
                Some(owner) => owner != id && self.removals.get(&key) != Some(&owner),
                None => false,
            },
        };
        if conflict {
            return Err(UuidError::DuplicateUuid {
                kind: id.kind(),
                uuid: uuid.to_string(),
            });
        }
        self.inserts.insert(key, id);
        Ok(())
    }
}
