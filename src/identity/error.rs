//! Errors raised while stamping identity onto a committing transaction

use crate::graph::{EntityId, EntityKind, GraphError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UuidError {
    /// Another live entity of the same kind already holds this UUID
    #[error("{kind} with uuid '{uuid}' already exists")]
    DuplicateUuid { kind: EntityKind, uuid: String },

    /// A caller-supplied UUID that is not a non-empty string
    #[error("invalid uuid on {entity}: {reason}")]
    InvalidUuid { entity: EntityId, reason: String },

    /// The committed update timestamp has no successor
    #[error("{property} on {entity} cannot advance past {value}")]
    TimestampOverflow { entity: EntityId, property: String, value: i64 },

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl UuidError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, UuidError::DuplicateUuid { .. })
    }
}

pub type UuidResult<T> = Result<T, UuidError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn test_messages() {
        let dup = UuidError::DuplicateUuid {
            kind: EntityKind::Node,
            uuid: "abc".to_string(),
        };
        assert!(dup.is_duplicate());
        assert_eq!(dup.to_string(), "node with uuid 'abc' already exists");

        let invalid = UuidError::InvalidUuid {
            entity: EntityId::Node(NodeId::new(3)),
            reason: "expected a string, got Integer".to_string(),
        };
        assert!(!invalid.is_duplicate());
        assert!(invalid.to_string().contains("NodeId(3)"));

        let overflow = UuidError::TimestampOverflow {
            entity: EntityId::Node(NodeId::new(3)),
            property: "updatedAt".to_string(),
            value: i64::MAX,
        };
        assert!(!overflow.is_duplicate());
        assert!(overflow.to_string().starts_with("updatedAt on"));
    }
}
