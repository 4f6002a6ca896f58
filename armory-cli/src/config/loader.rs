use super::types::{ArmoryConfig, RawArmoryConfig, RawAuditConfig};
use anyhow::{Context, Result};
use armory_audit::AuditConfig;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<ArmoryConfig> {
        Self::load_layers(&Self::user_config_path(), &Self::project_config_path())
    }

    /// Merge the user layer and then the project layer over it. Missing files
    /// are skipped.
    pub fn load_layers(user_path: &Path, project_path: &Path) -> Result<ArmoryConfig> {
        let mut raw = RawArmoryConfig::default();

        for path in [user_path, project_path] {
            if let Some(layer) = Self::read_raw(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }

        Ok(Self::finalize(raw))
    }

    /// User config path (`$XDG_CONFIG_HOME/armory/config.toml`)
    pub fn user_config_path() -> PathBuf {
        armory_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ARMORY_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ARMORY_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".armory/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawArmoryConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawArmoryConfig, overlay: RawArmoryConfig) -> RawArmoryConfig {
        RawArmoryConfig {
            audit: RawAuditConfig {
                backend: overlay.audit.backend.or(base.audit.backend),
                path: overlay.audit.path.or(base.audit.path),
                fsync: overlay.audit.fsync.or(base.audit.fsync),
                deprecation: overlay.audit.deprecation.or(base.audit.deprecation),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawArmoryConfig) -> ArmoryConfig {
        let defaults = AuditConfig::default();
        ArmoryConfig {
            audit: AuditConfig {
                backend: raw.audit.backend.unwrap_or(defaults.backend),
                path: raw.audit.path,
                fsync: raw.audit.fsync.unwrap_or(defaults.fsync),
                deprecation: raw.audit.deprecation.unwrap_or(defaults.deprecation),
            },
        }
    }
}
