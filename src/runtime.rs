//! Wires a configuration into a running database with its UUID modules

use crate::config::Config;
use crate::graph::{GraphDatabase, TxError};
use crate::identity::{LookupService, ModuleRegistry, RegistryError, UuidModule};
use crate::persistence::StorageError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to install module '{module}': {source}")]
    Install {
        module: String,
        #[source]
        source: TxError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A database with every configured module registered
pub struct UuidRuntime {
    db: Arc<GraphDatabase>,
    lookup: LookupService,
}

impl UuidRuntime {
    /// Open the database (durable when `server.data_path` is set), rebuild
    /// each module's index and backfill where configured
    pub fn start(config: &Config) -> RuntimeResult<Self> {
        let db = match &config.server.data_path {
            Some(path) => GraphDatabase::open(path)?,
            None => GraphDatabase::in_memory(),
        };
        Self::with_modules(db, config.modules.iter().map(|m| Arc::new(UuidModule::new(m.clone()))))
    }

    /// Start over an existing database with pre-built modules
    pub fn with_modules(db: GraphDatabase, modules: impl IntoIterator<Item = Arc<UuidModule>>) -> RuntimeResult<Self> {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            if registry.get(module.name()).is_some() {
                return Err(RegistryError::DuplicateModule(module.name().to_string()).into());
            }
            let backfilled = module.install(&db).map_err(|source| RuntimeError::Install {
                module: module.name().to_string(),
                source,
            })?;
            info!(
                "Module '{}' started (tracking {:?}, {} backfilled)",
                module.name(),
                module.config().track,
                backfilled
            );
            registry.register(module)?;
        }
        info!("Lookup modules: {}", registry.names().join(", "));

        Ok(Self {
            db: Arc::new(db),
            lookup: LookupService::new(Arc::new(registry)),
        })
    }

    pub fn database(&self) -> &Arc<GraphDatabase> {
        &self.db
    }

    pub fn lookup(&self) -> &LookupService {
        &self.lookup
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.lookup.registry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{props, EntityKind};
    use crate::identity::ModuleConfig;
    use tempfile::TempDir;

    #[test]
    fn test_start_in_memory_with_defaults() {
        let runtime = UuidRuntime::start(&Config::default()).unwrap();
        assert!(!runtime.database().is_durable());
        assert_eq!(runtime.registry().names(), vec!["UIDM"]);
    }

    #[test]
    fn test_duplicate_modules_are_rejected_before_install() {
        let db = GraphDatabase::in_memory();
        let modules = vec![
            Arc::new(UuidModule::new(ModuleConfig::new("A"))),
            Arc::new(UuidModule::new(ModuleConfig::new("A"))),
        ];
        let err = UuidRuntime::with_modules(db, modules).err().unwrap();
        assert!(matches!(err, RuntimeError::Registry(RegistryError::DuplicateModule(_))));
    }

    #[test]
    fn test_restart_rebuilds_index() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.data_path = Some(dir.path().to_path_buf());

        let id = {
            let runtime = UuidRuntime::start(&config).unwrap();
            let mut tx = runtime.database().begin();
            let id = tx.create_node(["Person"], props([("uuid", "persisted")]));
            tx.commit().unwrap();
            id
        };

        let runtime = UuidRuntime::start(&config).unwrap();
        assert!(runtime.database().is_durable());
        assert_eq!(
            runtime.lookup().resolve(None, EntityKind::Node, "persisted").unwrap().as_u64(),
            id.as_u64()
        );
    }
}
