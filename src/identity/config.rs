//! Per-instance configuration of the UUID module

use crate::graph::{Edge, EntityKind, Node};
use serde::{Deserialize, Serialize};

/// Name of the module instance used when a lookup names none
pub const DEFAULT_MODULE_NAME: &str = "UIDM";

/// Which entity kinds a module instance assigns UUIDs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedKinds {
    #[default]
    All,
    Nodes,
    Relationships,
}

impl TrackedKinds {
    pub fn includes(&self, kind: EntityKind) -> bool {
        match self {
            TrackedKinds::All => true,
            TrackedKinds::Nodes => kind == EntityKind::Node,
            TrackedKinds::Relationships => kind == EntityKind::Relationship,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    pub enabled: bool,
    pub created_property: String,
    pub updated_property: String,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            created_property: "createdAt".to_string(),
            updated_property: "updatedAt".to_string(),
        }
    }
}

/// Configuration of one named module instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub name: String,
    pub track: TrackedKinds,
    /// Property holding the assigned UUID
    pub uuid_property: String,
    /// Generate UUIDs as 32 hex digits instead of the hyphenated form
    pub strip_hyphens: bool,
    /// Only nodes carrying one of these labels are tracked; empty tracks all
    pub labels: Vec<String>,
    /// Only relationships of these types are tracked; empty tracks all
    pub relationship_types: Vec<String>,
    /// Assign UUIDs to tracked entities that have none when the module starts
    pub backfill: bool,
    pub timestamps: TimestampConfig,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODULE_NAME.to_string(),
            track: TrackedKinds::All,
            uuid_property: "uuid".to_string(),
            strip_hyphens: false,
            labels: Vec::new(),
            relationship_types: Vec::new(),
            backfill: true,
            timestamps: TimestampConfig::default(),
        }
    }
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_track(mut self, track: TrackedKinds) -> Self {
        self.track = track;
        self
    }

    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relationship_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.relationship_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_backfill(mut self, backfill: bool) -> Self {
        self.backfill = backfill;
        self
    }

    pub fn without_timestamps(mut self) -> Self {
        self.timestamps.enabled = false;
        self
    }

    pub fn tracks(&self, kind: EntityKind) -> bool {
        self.track.includes(kind)
    }

    pub fn tracks_node(&self, node: &Node) -> bool {
        self.tracks(EntityKind::Node)
            && (self.labels.is_empty() || node.labels.iter().any(|l| self.labels.iter().any(|c| c == l.as_str())))
    }

    pub fn tracks_edge(&self, edge: &Edge) -> bool {
        self.tracks(EntityKind::Relationship)
            && (self.relationship_types.is_empty()
                || self.relationship_types.iter().any(|t| t == edge.edge_type.as_str()))
    }

    /// Properties this module owns on every tracked entity
    pub fn managed_properties(&self) -> Vec<&str> {
        let mut managed = vec![self.uuid_property.as_str()];
        if self.timestamps.enabled {
            managed.push(self.timestamps.created_property.as_str());
            managed.push(self.timestamps.updated_property.as_str());
        }
        managed
    }

    /// Check the instance on its own; cross-instance rules live in [`crate::config::Config`]
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("module name must not be empty".to_string());
        }
        if self.uuid_property.is_empty() {
            return Err(format!("module '{}': uuid_property must not be empty", self.name));
        }
        if self.timestamps.enabled {
            let ts = &self.timestamps;
            if ts.created_property.is_empty() || ts.updated_property.is_empty() {
                return Err(format!("module '{}': timestamp property names must not be empty", self.name));
            }
            if ts.created_property == ts.updated_property
                || ts.created_property == self.uuid_property
                || ts.updated_property == self.uuid_property
            {
                return Err(format!("module '{}': uuid and timestamp properties must be distinct", self.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, Label, NodeId, PropertyMap};

    #[test]
    fn test_defaults() {
        let config = ModuleConfig::default();
        assert_eq!(config.name, "UIDM");
        assert_eq!(config.uuid_property, "uuid");
        assert!(config.tracks(EntityKind::Node));
        assert!(config.tracks(EntityKind::Relationship));
        assert_eq!(config.managed_properties(), vec!["uuid", "createdAt", "updatedAt"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tracked_kinds() {
        assert!(!TrackedKinds::Nodes.includes(EntityKind::Relationship));
        assert!(TrackedKinds::Relationships.includes(EntityKind::Relationship));
        assert!(!TrackedKinds::Relationships.includes(EntityKind::Node));

        let parsed: TrackedKinds = serde_yaml::from_str("relationships").unwrap();
        assert_eq!(parsed, TrackedKinds::Relationships);
    }

    #[test]
    fn test_label_and_type_filters() {
        let config = ModuleConfig::new("people")
            .with_labels(["Person"])
            .with_relationship_types(["KNOWS"]);

        let person = Node::new(NodeId::new(0), vec![Label::new("Person"), Label::new("Admin")], PropertyMap::new());
        let company = Node::new(NodeId::new(1), vec![Label::new("Company")], PropertyMap::new());
        assert!(config.tracks_node(&person));
        assert!(!config.tracks_node(&company));

        let knows = Edge::new(EdgeId::new(0), NodeId::new(0), NodeId::new(1), "KNOWS", PropertyMap::new());
        let works = Edge::new(EdgeId::new(1), NodeId::new(0), NodeId::new(1), "WORKS_AT", PropertyMap::new());
        assert!(config.tracks_edge(&knows));
        assert!(!config.tracks_edge(&works));

        let nodes_only = ModuleConfig::new("n").with_track(TrackedKinds::Nodes);
        assert!(!nodes_only.tracks_edge(&knows));
    }

    #[test]
    fn test_validation() {
        let mut config = ModuleConfig::new(" ");
        assert!(config.validate().is_err());

        config.name = "m".to_string();
        config.timestamps.updated_property = "createdAt".to_string();
        assert!(config.validate().is_err());

        // clashing names are fine when timestamps are off
        config.timestamps.enabled = false;
        assert!(config.validate().is_ok());

        config.uuid_property.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ModuleConfig = serde_yaml::from_str("name: rels\ntrack: relationships\n").unwrap();
        assert_eq!(config.name, "rels");
        assert_eq!(config.track, TrackedKinds::Relationships);
        assert_eq!(config.uuid_property, "uuid");
        assert!(config.timestamps.enabled);
    }
}
