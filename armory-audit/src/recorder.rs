//! The audit recorder
//!
//! Validates events, stamps them and appends them to the configured store.
//! The recorder keeps no mutable state of its own; concurrent callers only
//! share the store.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{debug, error, warn};

use crate::config::{AuditConfig, StoreBackend};
use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult, StorageError, ValidationError};
use crate::event::{AuditEvent, RawAuditEvent};
use crate::filter::AuditFilter;
use crate::store::{AuditStore, EntryStream, JsonlAuditStore, MemoryAuditStore, SqliteAuditStore};
use crate::taxonomy::DeprecationPolicy;

/// Records audit events into an append-only store.
///
/// Failed appends are returned to the caller and never retried here; whether
/// to retry is up to the integrating handler.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    deprecation: DeprecationPolicy,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            deprecation: DeprecationPolicy::default(),
        }
    }

    pub fn with_deprecation_policy(mut self, policy: DeprecationPolicy) -> Self {
        self.deprecation = policy;
        self
    }

    /// Build a recorder with the backend described by `config`
    pub fn from_config(config: &AuditConfig) -> AuditResult<Self> {
        let store: Arc<dyn AuditStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryAuditStore::new()),
            StoreBackend::Jsonl => {
                Arc::new(JsonlAuditStore::new(durable_path(config)?).with_fsync(config.fsync))
            }
            StoreBackend::Sqlite => {
                Arc::new(SqliteAuditStore::open_with(durable_path(config)?, config.fsync)?)
            }
        };
        debug!(backend = store.backend(), "audit recorder ready");
        Ok(Self::new(store).with_deprecation_policy(config.deprecation))
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    pub fn deprecation_policy(&self) -> DeprecationPolicy {
        self.deprecation
    }

    /// Validate, stamp and append an event.
    ///
    /// On a validation error nothing is written. On a storage error the entry
    /// may not have been persisted and the caller decides what to do.
    pub async fn record(&self, event: AuditEvent) -> AuditResult<AuditLogEntry> {
        let event = event.normalized();
        event.validate()?;
        self.check_deprecation(&event)?;

        let entry = AuditLogEntry::from_event(event);
        self.store.append(&entry).await?;

        debug!(
            id = %entry.id(),
            action = %entry.event().action_type,
            entity_type = %entry.event().entity_type,
            status = %entry.event().status,
            "audit entry recorded"
        );
        Ok(entry)
    }

    /// Parse an untyped event and record it
    pub async fn record_raw(&self, raw: RawAuditEvent) -> AuditResult<AuditLogEntry> {
        let event = AuditEvent::try_from(raw)?;
        self.record(event).await
    }

    /// Record an event on behalf of a business action that must not fail
    /// because auditing did.
    ///
    /// Any error is logged on the `armory_audit::degraded` target, kept apart
    /// from the business action's own error reporting, and `None` is returned.
    pub async fn record_or_report(&self, event: AuditEvent) -> Option<AuditLogEntry> {
        let action = event.action_type;
        let entity_type = event.entity_type;
        let entity_id = event.entity_id.clone();

        match self.record(event).await {
            Ok(entry) => Some(entry),
            Err(AuditError::Validation(err)) => {
                error!(
                    target: "armory_audit::degraded",
                    %action,
                    %entity_type,
                    entity_id = entity_id.as_deref().unwrap_or("-"),
                    error = %err,
                    "audit event rejected; action was not audited"
                );
                None
            }
            Err(AuditError::Storage(err)) => {
                error!(
                    target: "armory_audit::degraded",
                    %action,
                    %entity_type,
                    entity_id = entity_id.as_deref().unwrap_or("-"),
                    backend = self.store.backend(),
                    error = %err,
                    "audit write failed; action was not audited"
                );
                None
            }
        }
    }

    /// Stream entries matching `filter` in insertion order.
    ///
    /// Every call starts a fresh read of the store.
    pub async fn query(&self, filter: &AuditFilter) -> AuditResult<EntryStream> {
        filter.validate()?;
        Ok(self.store.list(filter).await?)
    }

    /// Collect every entry matching `filter`
    pub async fn query_all(&self, filter: &AuditFilter) -> AuditResult<Vec<AuditLogEntry>> {
        let mut stream = self.query(filter).await?;
        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn check_deprecation(&self, event: &AuditEvent) -> Result<(), ValidationError> {
        let Some(replacement) = event.entity_type.replacement() else {
            return Ok(());
        };

        match self.deprecation {
            DeprecationPolicy::Allow => Ok(()),
            DeprecationPolicy::Warn => {
                warn!(
                    entity_type = %event.entity_type,
                    %replacement,
                    "recording entry with deprecated entity type"
                );
                Ok(())
            }
            DeprecationPolicy::Reject => Err(ValidationError::DeprecatedEntityType {
                entity_type: event.entity_type,
                replacement,
            }),
        }
    }
}

/// File location for a durable backend; never falls back to memory
fn durable_path(config: &AuditConfig) -> Result<PathBuf, StorageError> {
    config.store_path().ok_or_else(|| {
        StorageError::Unavailable(format!(
            "no store path for the {} backend",
            config.backend.as_str()
        ))
    })
}
