//! Append-only storage for audit entries
//!
//! Three backends share the [`AuditStore`] contract: an in-memory log for
//! tests and embedding, a JSONL file, and SQLite.

mod jsonl;
mod memory;
mod migrations;
mod sqlite;

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::{Stream, StreamExt};

use crate::entry::AuditLogEntry;
use crate::error::StorageError;
use crate::filter::AuditFilter;

pub use jsonl::JsonlAuditStore;
pub use memory::MemoryAuditStore;
pub use sqlite::SqliteAuditStore;

/// Entries in insertion order. Each `list` call opens a fresh read, so
/// dropping a stream and listing again reflects appends made in between.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<AuditLogEntry, StorageError>> + Send>>;

/// Durable, append-only audit storage
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a completed entry. Either the whole entry becomes visible or
    /// none of it does.
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError>;

    /// Entries matching `filter`, oldest first
    async fn list(&self, filter: &AuditFilter) -> Result<EntryStream, StorageError>;

    /// Total number of stored entries
    async fn count(&self) -> Result<usize, StorageError>;

    /// Short backend name for logs and diagnostics
    fn backend(&self) -> &'static str;
}

/// Apply `filter` to a raw stream of stored entries.
///
/// Errors pass through untouched and count towards `limit`, so a caller never
/// misses a failure that sits inside the requested window.
pub(crate) fn filtered<S>(entries: S, filter: &AuditFilter) -> EntryStream
where
    S: Stream<Item = Result<AuditLogEntry, StorageError>> + Send + 'static,
{
    let criteria = filter.clone();
    let matching = entries.filter(move |item| match item {
        Ok(entry) => criteria.matches(entry),
        Err(_) => true,
    });

    match filter.limit {
        Some(limit) => Box::pin(matching.take(limit)),
        None => Box::pin(matching),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionType, Actor, AuditEvent, EntityType};

    fn entry(entity_id: &str) -> AuditLogEntry {
        AuditLogEntry::from_event(
            AuditEvent::new(Actor::user("u1", "Admin"), ActionType::Update, EntityType::Magazine)
                .with_entity_id(entity_id),
        )
    }

    #[tokio::test]
    async fn test_filtered_applies_criteria_then_limit() {
        let entries = vec![entry("m-1"), entry("m-2"), entry("m-1"), entry("m-1")];
        let expected: Vec<_> = entries.iter().map(|e| e.id()).collect();
        let source = tokio_stream::iter(entries.into_iter().map(Ok));

        let filter = AuditFilter::new().with_entity_id("m-1").limit(2);
        let ids: Vec<_> = filtered(source, &filter)
            .map(|item| item.unwrap().id())
            .collect()
            .await;

        assert_eq!(ids, vec![expected[0], expected[2]]);
    }

    #[tokio::test]
    async fn test_filtered_passes_errors_through() {
        let source = tokio_stream::iter(vec![
            Ok(entry("m-9")),
            Err(StorageError::Corrupt {
                line: 2,
                reason: "truncated".into(),
            }),
        ]);

        let filter = AuditFilter::new().with_entity_id("m-1");
        let items: Vec<_> = filtered(source, &filter).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(StorageError::Corrupt { line: 2, .. })));
    }
}
