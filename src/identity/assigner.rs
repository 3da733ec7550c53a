//! UUID assignment and protection on committing entities

use super::error::{UuidError, UuidResult};
use super::generator::UuidGenerator;
use crate::graph::{EntityId, PropertyValue, TransactionData};
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to the UUID of an already committed entity
#[derive(Debug, Clone, PartialEq)]
pub enum ExistingUuid {
    /// The committed UUID is kept (any write to it was reverted)
    Kept(String),
    /// The entity had no UUID and the transaction supplies one
    Supplied(String),
    /// Still no UUID
    Absent,
}

pub struct IdentifierAssigner {
    property: String,
    generator: Arc<dyn UuidGenerator>,
}

impl IdentifierAssigner {
    pub fn new(property: impl Into<String>, generator: Arc<dyn UuidGenerator>) -> Self {
        Self {
            property: property.into(),
            generator,
        }
    }

    pub fn generate(&self) -> String {
        self.generator.generate()
    }

    /// Give a created entity its UUID
    ///
    /// A UUID already present (written by the caller, or by an earlier pass
    /// over the same transaction) is kept; otherwise a fresh one is written.
    pub fn assign(&self, data: &mut TransactionData<'_>, id: EntityId) -> UuidResult<String> {
        let supplied = data.properties(id).and_then(|p| p.get(&self.property)).cloned();
        match supplied {
            Some(value) => self.validate(id, &value),
            None => {
                let uuid = self.generator.generate();
                data.set_property(id, self.property.as_str(), uuid.as_str())?;
                debug!("Assigned {} '{}' to {}", self.property, uuid, id);
                Ok(uuid)
            }
        }
    }

    /// Undo any write to the committed UUID of a modified entity
    pub fn protect(&self, data: &mut TransactionData<'_>, id: EntityId) -> UuidResult<ExistingUuid> {
        let committed = data
            .previous_properties(id)
            .and_then(|p| p.get(&self.property))
            .cloned();
        let current = data.properties(id).and_then(|p| p.get(&self.property)).cloned();

        match (committed, current) {
            (Some(committed), current) => {
                if current.as_ref() != Some(&committed) {
                    warn!("Reverting write to immutable {} on {}", self.property, id);
                    data.set_property(id, self.property.as_str(), committed.clone())?;
                }
                Ok(match committed {
                    PropertyValue::String(uuid) => ExistingUuid::Kept(uuid),
                    _ => ExistingUuid::Absent,
                })
            }
            (None, Some(value)) => Ok(ExistingUuid::Supplied(self.validate(id, &value)?)),
            (None, None) => Ok(ExistingUuid::Absent),
        }
    }

    fn validate(&self, id: EntityId, value: &PropertyValue) -> UuidResult<String> {
        match value {
            PropertyValue::String(s) if !s.is_empty() => Ok(s.clone()),
            PropertyValue::String(_) => Err(UuidError::InvalidUuid {
                entity: id,
                reason: format!("{} must not be empty", self.property),
            }),
            other => Err(UuidError::InvalidUuid {
                entity: id,
                reason: format!("{} must be a string, got {}", self.property, other.type_name()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::transaction::TxState;
    use crate::graph::{props, ChangeSet, GraphStore, Label, Node, NodeId, PropertyMap};
    use uuid::Uuid;

    struct Fixed;

    impl UuidGenerator for Fixed {
        fn generate(&self) -> String {
            "generated".to_string()
        }
    }

    fn assigner() -> IdentifierAssigner {
        IdentifierAssigner::new("uuid", Arc::new(Fixed))
    }

    fn person(id: u64, properties: PropertyMap) -> Node {
        Node::new(NodeId::new(id), vec![Label::new("Person")], properties)
    }

    #[test]
    fn test_assign_generates_once() {
        let store = GraphStore::new();
        let mut state = TxState::default();
        state.created_nodes.insert(NodeId::new(0));
        state.nodes.insert(NodeId::new(0), Some(person(0, PropertyMap::new())));
        let mut data = TransactionData::new(Uuid::new_v4(), &store, &mut state);
        let id = EntityId::Node(NodeId::new(0));

        assert_eq!(assigner().assign(&mut data, id).unwrap(), "generated");
        // a second pass keeps what is there
        data.set_property(id, "uuid", "kept").unwrap();
        assert_eq!(assigner().assign(&mut data, id).unwrap(), "kept");
    }

    #[test]
    fn test_protect_reverts_and_reports() {
        let mut store = GraphStore::new();
        store.apply(&ChangeSet {
            nodes: vec![person(0, props([("uuid", "original")])), person(1, PropertyMap::new())],
            ..Default::default()
        });
        let mut state = TxState::default();
        state.nodes.insert(NodeId::new(0), Some(person(0, props([("uuid", "forged")]))));
        state.nodes.insert(NodeId::new(1), Some(person(1, props([("uuid", 5i64)]))));
        let mut data = TransactionData::new(Uuid::new_v4(), &store, &mut state);

        let tampered = EntityId::Node(NodeId::new(0));
        assert_eq!(
            assigner().protect(&mut data, tampered).unwrap(),
            ExistingUuid::Kept("original".to_string())
        );
        assert_eq!(
            data.properties(tampered).unwrap().get("uuid"),
            Some(&PropertyValue::from("original"))
        );

        let err = assigner().protect(&mut data, EntityId::Node(NodeId::new(1))).unwrap_err();
        assert!(matches!(err, UuidError::InvalidUuid { .. }));
    }
}
