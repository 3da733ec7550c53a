//! Server and module configuration, loaded from YAML

use crate::identity::ModuleConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub address: String,
    /// Port
    pub port: u16,
    /// Data directory for persistence (None = in-memory only)
    pub data_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7474,
            data_path: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub modules: Vec<ModuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            modules: vec![ModuleConfig::default()],
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.modules.is_empty() {
            return Err(ConfigError::Invalid("at least one module must be configured".to_string()));
        }
        let mut names = HashSet::new();
        for module in &self.modules {
            module.validate().map_err(ConfigError::Invalid)?;
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate module name '{}'", module.name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TrackedKinds;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:7474");
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules[0].name, "UIDM");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
server:
  address: 0.0.0.0
  port: 8080
  data_path: /var/lib/uuid
modules:
  - name: UIDM
    track: nodes
    labels: [Person]
  - name: RELS
    track: relationships
    uuid_property: rid
    strip_hyphens: true
    backfill: false
    timestamps:
      enabled: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.data_path, Some(PathBuf::from("/var/lib/uuid")));
        assert_eq!(config.modules[0].track, TrackedKinds::Nodes);
        assert_eq!(config.modules[0].labels, vec!["Person".to_string()]);
        assert_eq!(config.modules[1].uuid_property, "rid");
        assert!(config.modules[1].strip_hyphens);
        assert!(!config.modules[1].backfill);
        assert!(!config.modules[1].timestamps.enabled);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = Config::from_yaml("modules:\n  - name: A\n  - name: A\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_rejects_empty_module_list() {
        assert!(matches!(Config::from_yaml("modules: []"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_track_value() {
        assert!(matches!(
            Config::from_yaml("modules:\n  - name: A\n    track: everything\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_shipped_example_config() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/uuid-all.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 9000").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);

        let missing = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
