//! Node implementation for the host graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node in the property graph
///
/// Nodes carry a database id, a set of labels and a property map. Creation
/// and update timestamps are not intrinsic fields here; they live in the
/// property map and are maintained by the UUID module's transaction hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Set of labels for this node
    pub labels: HashSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node with labels and properties
    pub fn new(id: NodeId, labels: impl IntoIterator<Item = Label>, properties: PropertyMap) -> Self {
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Labels in a stable order, for output
    pub fn sorted_labels(&self) -> Vec<&Label> {
        let mut labels: Vec<&Label> = self.labels.iter().collect();
        labels.sort();
        labels
    }

    /// Set a property value, returning the previous one
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Remove a property
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    /// JSON view exposed by the host read endpoint
    pub fn to_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!({
            "id": self.id.as_u64(),
            "labels": self.sorted_labels().iter().map(|l| l.as_str()).collect::<Vec<_>>(),
            "properties": properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::property::props;

    #[test]
    fn test_node_labels_and_properties() {
        let mut node = Node::new(
            NodeId::new(1),
            vec![Label::new("Person"), Label::new("Employee")],
            props([("name", "Luanne")]),
        );

        assert!(node.has_label(&Label::new("Person")));
        assert!(!node.has_label(&Label::new("Robot")));
        assert_eq!(node.sorted_labels()[0].as_str(), "Employee");

        let old = node.set_property("name", "Michal");
        assert_eq!(old, Some(PropertyValue::from("Luanne")));
        assert_eq!(node.get_property("name").unwrap().as_string(), Some("Michal"));
        assert!(node.remove_property("name").is_some());
        assert!(node.get_property("name").is_none());
    }

    #[test]
    fn test_node_json() {
        let node = Node::new(
            NodeId::new(0),
            vec![Label::new("Person")],
            props([("uuid", PropertyValue::from("123")), ("createdAt", 5i64.into())]),
        );
        let json = node.to_json();
        assert_eq!(json["id"], 0);
        assert_eq!(json["labels"][0], "Person");
        assert_eq!(json["properties"]["uuid"], "123");
        assert_eq!(json["properties"]["createdAt"], 5);
    }
}
