//! Recorder configuration

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::taxonomy::DeprecationPolicy;

/// Which storage backend the recorder writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    Jsonl,
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Jsonl => "jsonl",
            Self::Sqlite => "sqlite",
        }
    }

    pub const ALL: [StoreBackend; 3] = [Self::Memory, Self::Jsonl, Self::Sqlite];

    /// File name used when no explicit path is configured
    pub fn default_file_name(&self) -> Option<&'static str> {
        match self {
            Self::Memory => None,
            Self::Jsonl => Some("audit.jsonl"),
            Self::Sqlite => Some("audit.db"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                field: "backend",
                value: s.to_string(),
            })
    }
}

/// `[audit]` section of the armory config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Store location; defaults to a file under the armory data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Wait for each append to reach disk
    #[serde(default = "default_fsync")]
    pub fsync: bool,

    #[serde(default)]
    pub deprecation: DeprecationPolicy,
}

fn default_fsync() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            fsync: default_fsync(),
            deprecation: DeprecationPolicy::default(),
        }
    }
}

impl AuditConfig {
    /// Resolved store path, `None` for the memory backend
    pub fn store_path(&self) -> Option<PathBuf> {
        let file_name = self.backend.default_file_name()?;
        Some(
            self.path
                .clone()
                .unwrap_or_else(|| armory_paths::data_dir().join(file_name)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = AuditConfig::default();
        assert_eq!(config.backend, StoreBackend::Jsonl);
        assert!(config.fsync);
        assert_eq!(config.deprecation, DeprecationPolicy::Warn);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_parse_from_toml() {
        let config: AuditConfig = toml::from_str(
            r#"
            backend = "sqlite"
            path = "/var/lib/armory/audit.db"
            deprecation = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.path, Some(PathBuf::from("/var/lib/armory/audit.db")));
        assert!(config.fsync);
        assert_eq!(config.deprecation, DeprecationPolicy::Reject);
    }

    #[test]
    fn test_backend_from_str_matches_config_names() {
        for backend in StoreBackend::ALL {
            assert_eq!(backend.as_str().parse::<StoreBackend>(), Ok(backend));
            let config: AuditConfig =
                toml::from_str(&format!("backend = \"{}\"", backend.as_str())).unwrap();
            assert_eq!(config.backend, backend);
        }

        let err = "tape".parse::<StoreBackend>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownVariant {
                field: "backend",
                value: "tape".into(),
            }
        );
    }

    #[test]
    fn test_store_path_resolution() {
        let explicit = AuditConfig {
            path: Some(PathBuf::from("/tmp/armory-audit.jsonl")),
            ..Default::default()
        };
        assert_eq!(
            explicit.store_path(),
            Some(PathBuf::from("/tmp/armory-audit.jsonl"))
        );

        let sqlite = AuditConfig {
            backend: StoreBackend::Sqlite,
            ..Default::default()
        };
        assert!(sqlite.store_path().unwrap().ends_with("armory/audit.db"));

        let memory = AuditConfig {
            backend: StoreBackend::Memory,
            path: Some(PathBuf::from("/ignored")),
            ..Default::default()
        };
        assert!(memory.store_path().is_none());
    }
}
