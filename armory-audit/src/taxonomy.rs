//! Closed taxonomies for audit entries
//!
//! Every enum here is a closed set. Adding a trackable entity or a new kind of
//! action means adding a variant, which forces every `match` in the crate to be
//! revisited. The wire names are the strings stored in the log and accepted
//! from external callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Who performed an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    User,
    System,
}

impl ActorType {
    pub const ALL: [ActorType; 2] = [Self::User, Self::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::System => "SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "SYSTEM" => Some(Self::System),
            _ => None,
        }
    }
}

/// Kind of mutation being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    LogUsage,
    LogMaintenance,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::LogUsage,
        Self::LogMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::LogUsage => "LOG_USAGE",
            Self::LogMaintenance => "LOG_MAINTENANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "LOG_USAGE" => Some(Self::LogUsage),
            "LOG_MAINTENANCE" => Some(Self::LogMaintenance),
            _ => None,
        }
    }
}

/// Domain object targeted by an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    FirearmDefinition,
    Firearm,
    Magazine,
    Ammunition,
    Depot,
    UsageScenario,
    DailyAmmunitionUsage,
    Shipment,
    ShipmentTypeDefinition,
    MaintenanceLog,
    /// Superseded by [`EntityType::DailyAmmunitionUsage`]. Kept so entries
    /// written before the switch still deserialize.
    AmmunitionUsage,
}

impl EntityType {
    pub const ALL: [EntityType; 11] = [
        Self::FirearmDefinition,
        Self::Firearm,
        Self::Magazine,
        Self::Ammunition,
        Self::Depot,
        Self::UsageScenario,
        Self::DailyAmmunitionUsage,
        Self::Shipment,
        Self::ShipmentTypeDefinition,
        Self::MaintenanceLog,
        Self::AmmunitionUsage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirearmDefinition => "FirearmDefinition",
            Self::Firearm => "Firearm",
            Self::Magazine => "Magazine",
            Self::Ammunition => "Ammunition",
            Self::Depot => "Depot",
            Self::UsageScenario => "UsageScenario",
            Self::DailyAmmunitionUsage => "DailyAmmunitionUsage",
            Self::Shipment => "Shipment",
            Self::ShipmentTypeDefinition => "ShipmentTypeDefinition",
            Self::MaintenanceLog => "MaintenanceLog",
            Self::AmmunitionUsage => "AmmunitionUsage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|entity| entity.as_str() == s)
    }

    /// Whether new entries should stop using this member.
    pub fn is_deprecated(&self) -> bool {
        self.replacement().is_some()
    }

    /// Member that replaces a deprecated one.
    pub fn replacement(&self) -> Option<EntityType> {
        match self {
            Self::AmmunitionUsage => Some(Self::DailyAmmunitionUsage),
            _ => None,
        }
    }
}

/// Outcome of the audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub const ALL: [AuditStatus; 2] = [Self::Success, Self::Failure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// How the recorder treats deprecated taxonomy members on write.
///
/// Reads always accept deprecated members so historical entries stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeprecationPolicy {
    Allow,
    #[default]
    Warn,
    Reject,
}

impl DeprecationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

macro_rules! wire_name_impls {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| ValidationError::UnknownVariant {
                    field: $field,
                    value: s.to_string(),
                })
            }
        }
    };
}

wire_name_impls!(ActorType, "actor.type");
wire_name_impls!(ActionType, "actionType");
wire_name_impls!(EntityType, "entityType");
wire_name_impls!(AuditStatus, "status");
