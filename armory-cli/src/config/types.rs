use std::path::PathBuf;

use armory_audit::{AuditConfig, DeprecationPolicy, StoreBackend};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawArmoryConfig {
    #[serde(default)]
    pub audit: RawAuditConfig,
}

/// Audit section as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAuditConfig {
    pub backend: Option<StoreBackend>,
    pub path: Option<PathBuf>,
    pub fsync: Option<bool>,
    pub deprecation: Option<DeprecationPolicy>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ArmoryConfig {
    #[serde(default)]
    pub audit: AuditConfig,
}
