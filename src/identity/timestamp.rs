//! Creation and update timestamps

use super::config::TimestampConfig;
use super::error::{UuidError, UuidResult};
use super::generator::Clock;
use crate::graph::{EntityId, PropertyValue, TransactionData};
use std::sync::Arc;
use tracing::warn;

pub struct TimestampAssigner {
    created: String,
    updated: String,
    clock: Arc<dyn Clock>,
}

impl TimestampAssigner {
    pub fn new(config: &TimestampConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            created: config.created_property.clone(),
            updated: config.updated_property.clone(),
            clock,
        }
    }

    /// Stamp a created entity
    ///
    /// A caller-supplied `created` is kept. `updated` always equals the final
    /// `created`, overwriting any value the caller wrote.
    pub fn on_create(&self, data: &mut TransactionData<'_>, id: EntityId) -> UuidResult<()> {
        let created = data.properties(id).and_then(|p| p.get(&self.created)).cloned();

        let created = match created {
            Some(value) => value,
            None => {
                let now = PropertyValue::Integer(self.clock.now_millis());
                data.set_property(id, self.created.as_str(), now.clone())?;
                now
            }
        };
        data.set_property(id, self.updated.as_str(), created)?;
        Ok(())
    }

    /// Maintain timestamps on a modified entity
    ///
    /// `created` is restored if the transaction touched it. When any property
    /// outside `managed` changed, `updated` moves to a value strictly greater
    /// than the committed one. A committed `updated` of `i64::MAX` vetoes the
    /// transaction.
    pub fn on_modify(&self, data: &mut TransactionData<'_>, id: EntityId, managed: &[&str]) -> UuidResult<()> {
        let (Some(before), Some(after)) = (data.previous_properties(id), data.properties(id)) else {
            return Ok(());
        };

        let committed_created = before.get(&self.created).cloned();
        let created_changed = after.get(&self.created) != committed_created.as_ref();
        let previous_updated = before.get(&self.updated).and_then(PropertyValue::as_millis);
        let changed = before
            .iter()
            .filter(|(k, _)| !managed.contains(&k.as_str()))
            .any(|(k, v)| after.get(k) != Some(v))
            || after
                .keys()
                .any(|k| !managed.contains(&k.as_str()) && !before.contains_key(k));

        if created_changed {
            if let Some(value) = committed_created {
                warn!("Reverting write to immutable {} on {}", self.created, id);
                data.set_property(id, self.created.as_str(), value)?;
            }
        }

        if changed {
            let now = self.clock.now_millis();
            let next = match previous_updated {
                Some(prev) if prev >= now => prev.checked_add(1).ok_or_else(|| UuidError::TimestampOverflow {
                    entity: id,
                    property: self.updated.clone(),
                    value: prev,
                })?,
                _ => now,
            };
            data.set_property(id, self.updated.as_str(), next)?;
        }
        Ok(())
    }
}
