//! Per-transaction dispatch of created, deleted and modified entities

use super::assigner::{ExistingUuid, IdentifierAssigner};
use super::config::ModuleConfig;
use super::error::UuidResult;
use super::generator::{Clock, UuidGenerator};
use super::index::{IndexDelta, UuidIndex};
use super::timestamp::TimestampAssigner;
use crate::graph::{EntityId, PropertyValue, TransactionData};
use std::sync::Arc;

pub struct TransactionInterceptor {
    config: ModuleConfig,
    assigner: IdentifierAssigner,
    timestamps: Option<TimestampAssigner>,
}

impl TransactionInterceptor {
    pub fn new(config: ModuleConfig, generator: Arc<dyn UuidGenerator>, clock: Arc<dyn Clock>) -> Self {
        let assigner = IdentifierAssigner::new(config.uuid_property.clone(), generator);
        let timestamps = config
            .timestamps
            .enabled
            .then(|| TimestampAssigner::new(&config.timestamps, clock));
        Self {
            config,
            assigner,
            timestamps,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn assigner(&self) -> &IdentifierAssigner {
        &self.assigner
    }

    fn tracks(&self, data: &TransactionData<'_>, id: EntityId) -> bool {
        match id {
            EntityId::Node(n) => data.node(n).is_some_and(|n| self.config.tracks_node(n)),
            EntityId::Relationship(e) => data.edge(e).is_some_and(|e| self.config.tracks_edge(e)),
        }
    }

    /// Stamp the transaction and compute the index changes it implies
    ///
    /// Deletions are handled first so a UUID freed by a deleted entity can be
    /// claimed by one created in the same transaction.
    pub fn intercept(&self, data: &mut TransactionData<'_>, index: &UuidIndex) -> UuidResult<IndexDelta> {
        let mut delta = IndexDelta::default();
        let property = self.config.uuid_property.as_str();

        for id in data.deleted().to_vec() {
            if !self.config.tracks(id.kind()) {
                continue;
            }
            let committed = data
                .previous_properties(id)
                .and_then(|p| p.get(property))
                .and_then(PropertyValue::as_string);
            if let Some(uuid) = committed {
                delta.release(uuid, id);
            }
        }

        for id in data.created().to_vec() {
            if !self.tracks(data, id) {
                continue;
            }
            let uuid = self.assigner.assign(data, id)?;
            delta.claim(index, &uuid, id)?;
            if let Some(timestamps) = &self.timestamps {
                timestamps.on_create(data, id)?;
            }
        }

        let managed = self.config.managed_properties();
        for id in data.modified().to_vec() {
            if !self.tracks(data, id) {
                continue;
            }
            if let ExistingUuid::Supplied(uuid) = self.assigner.protect(data, id)? {
                delta.claim(index, &uuid, id)?;
            }
            if let Some(timestamps) = &self.timestamps {
                timestamps.on_modify(data, id, &managed)?;
            }
        }

        Ok(delta)
    }
}
