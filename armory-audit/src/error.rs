//! Audit error types

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::taxonomy::{ActionType, EntityType};

/// A caller handed over an event (or filter) the recorder refuses to store.
///
/// Validation always happens before anything touches the store, so a
/// `ValidationError` guarantees nothing was appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown {field}: {value:?}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} is not allowed on {action} events")]
    UnexpectedField {
        field: &'static str,
        action: ActionType,
    },

    #[error("Entity type {entity_type} is deprecated for new entries, use {replacement}")]
    DeprecatedEntityType {
        entity_type: EntityType,
        replacement: EntityType,
    },

    #[error("Invalid time range: {from} is after {to}")]
    InvalidTimeRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// The durable store could not complete an append or a read.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt audit record #{line}: {reason}")]
    Corrupt { line: u64, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error returned by the recorder
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuditError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
