//! Concurrency tests for the audit recorder
//!
//! Many writers append through one recorder at once; every entry must land
//! exactly once with a distinct id and be readable in full.

use std::collections::HashSet;
use std::sync::Arc;

use armory_audit::{
    ActionType, Actor, AuditEvent, AuditFilter, AuditRecorder, AuditStore, EntityType,
    JsonlAuditStore, MemoryAuditStore, SqliteAuditStore,
};
use tempfile::TempDir;

const WRITERS: usize = 16;
const PER_WRITER: usize = 25;

async fn hammer(recorder: AuditRecorder) {
    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let recorder = recorder.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for n in 0..PER_WRITER {
                let event = AuditEvent::new(
                    Actor::user(format!("u{}", writer), format!("Clerk {}", writer)),
                    ActionType::LogMaintenance,
                    EntityType::MaintenanceLog,
                )
                .with_entity_id(format!("ml-{}-{}", writer, n))
                .with_details(serde_json::json!({"note": "x".repeat(512)}));
                ids.push(recorder.record(event).await.unwrap().id());
            }
            ids
        }));
    }

    let mut written = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(written.insert(id), "duplicate id {}", id);
        }
    }

    let stored = recorder.query_all(&AuditFilter::default()).await.unwrap();
    assert_eq!(stored.len(), WRITERS * PER_WRITER);
    let stored_ids: HashSet<_> = stored.iter().map(|e| e.id()).collect();
    assert_eq!(stored_ids, written);

    // Each writer's own entries keep their submission order
    for writer in 0..WRITERS {
        let actor = format!("u{}", writer);
        let mine = recorder
            .query_all(&AuditFilter::new().by_actor(actor.as_str()))
            .await
            .unwrap();
        let expected: Vec<_> = (0..PER_WRITER)
            .map(|n| format!("ml-{}-{}", writer, n))
            .collect();
        let got: Vec<_> = mine
            .iter()
            .map(|e| e.event().entity_id.clone().unwrap())
            .collect();
        assert_eq!(got, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_memory() {
    hammer(AuditRecorder::new(Arc::new(MemoryAuditStore::new()))).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_jsonl() {
    let dir = TempDir::new().unwrap();
    let store = JsonlAuditStore::new(dir.path().join("audit.jsonl")).with_fsync(false);
    hammer(AuditRecorder::new(Arc::new(store))).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAuditStore::open_with(dir.path().join("audit.db"), false).unwrap();
    hammer(AuditRecorder::new(Arc::new(store))).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_run_alongside_writers() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn AuditStore> =
        Arc::new(JsonlAuditStore::new(dir.path().join("audit.jsonl")).with_fsync(false));
    let recorder = AuditRecorder::new(store);

    let writer = {
        let recorder = recorder.clone();
        tokio::spawn(async move {
            for n in 0..100 {
                let event = AuditEvent::new(
                    Actor::user("u1", "Admin"),
                    ActionType::Create,
                    EntityType::Ammunition,
                )
                .with_entity_id(format!("lot-{}", n));
                recorder.record(event).await.unwrap();
            }
        })
    };

    let reader = {
        let recorder = recorder.clone();
        tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..50 {
                // Never a partial entry: every read parses cleanly
                let seen = recorder.query_all(&AuditFilter::default()).await.unwrap();
                assert!(seen.len() >= last);
                last = seen.len();
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(recorder.store().count().await.unwrap(), 100);
}
