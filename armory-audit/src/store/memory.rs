//! In-memory audit store

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuditStore, EntryStream, filtered};
use crate::entry::AuditLogEntry;
use crate::error::StorageError;
use crate::filter::AuditFilter;

/// Audit store backed by a `Vec`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<EntryStream, StorageError> {
        // Copy under the read lock so writers are never held up by a slow consumer
        let snapshot = self.entries.read().await.clone();
        Ok(filtered(
            tokio_stream::iter(snapshot.into_iter().map(Ok)),
            filter,
        ))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.entries.read().await.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionType, Actor, AuditEvent, EntityType};
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_memory_append_and_list() {
        let store = MemoryAuditStore::new();
        let entry = AuditLogEntry::from_event(
            AuditEvent::new(Actor::user("u1", "Admin"), ActionType::Create, EntityType::Firearm)
                .with_entity_id("f-1"),
        );
        store.append(&entry).await.unwrap();

        let listed: Vec<_> = store
            .list(&AuditFilter::default())
            .await
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .await
            .unwrap();
        assert_eq!(listed, vec![entry]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_list_is_restartable() {
        let store = MemoryAuditStore::new();
        let filter = AuditFilter::default();
        let make = |id: &str| {
            AuditLogEntry::from_event(
                AuditEvent::new(Actor::user("u1", "Admin"), ActionType::Delete, EntityType::Depot)
                    .with_entity_id(id),
            )
        };

        store.append(&make("d-1")).await.unwrap();
        let first: Vec<_> = store.list(&filter).await.unwrap().collect().await;

        store.append(&make("d-2")).await.unwrap();
        let second: Vec<_> = store.list(&filter).await.unwrap().collect().await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }
}
