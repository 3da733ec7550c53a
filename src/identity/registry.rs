//! Named module instances and UUID lookups across them

use super::config::DEFAULT_MODULE_NAME;
use super::UuidModule;
use crate::graph::{EntityId, EntityKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("module '{0}' is already registered")]
    DuplicateModule(String),
}

/// Every lookup miss looks the same to the caller: unknown module, unknown
/// UUID and untracked kind are not told apart
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("not found")]
    NotFound,
}

#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<UuidModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<UuidModule>) -> Result<(), RegistryError> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(RegistryError::DuplicateModule(name));
        }
        self.modules.insert(name, module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<UuidModule>> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<UuidModule>> {
        self.modules.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }
}

/// Resolves UUIDs to database ids
#[derive(Clone)]
pub struct LookupService {
    registry: Arc<ModuleRegistry>,
}

impl LookupService {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Look `uuid` up in the named module, or in `UIDM` when `module` is None
    pub fn resolve(&self, module: Option<&str>, kind: EntityKind, uuid: &str) -> Result<EntityId, LookupError> {
        self.registry
            .get(module.unwrap_or(DEFAULT_MODULE_NAME))
            .and_then(|m| m.lookup(kind, uuid))
            .ok_or(LookupError::NotFound)
    }

    pub fn node_id(&self, module: Option<&str>, uuid: &str) -> Result<u64, LookupError> {
        self.resolve(module, EntityKind::Node, uuid).map(|id| id.as_u64())
    }

    pub fn relationship_id(&self, module: Option<&str>, uuid: &str) -> Result<u64, LookupError> {
        self.resolve(module, EntityKind::Relationship, uuid).map(|id| id.as_u64())
    }
}
