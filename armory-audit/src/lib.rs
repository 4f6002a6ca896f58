//! armory-audit - append-only audit recording for armory
//!
//! Domain handlers (firearms, ammunition, depots, shipments, maintenance,
//! usage scenarios) report what they did through an [`AuditRecorder`]. The
//! recorder validates each [`AuditEvent`] against the closed taxonomy, stamps
//! it with an id and time, and appends it to an [`AuditStore`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use armory_audit::{
//!     ActionType, Actor, AuditEvent, AuditFilter, AuditRecorder, EntityType, MemoryAuditStore,
//! };
//!
//! # async fn example() -> armory_audit::AuditResult<()> {
//! let recorder = AuditRecorder::new(Arc::new(MemoryAuditStore::new()));
//!
//! let event = AuditEvent::new(
//!     Actor::user("u1", "Admin"),
//!     ActionType::LogUsage,
//!     EntityType::DailyAmmunitionUsage,
//! )
//! .with_entity_id("d-1");
//! let entry = recorder.record(event).await?;
//!
//! let history = recorder
//!     .query_all(&AuditFilter::for_entity(EntityType::DailyAmmunitionUsage, "d-1"))
//!     .await?;
//! assert_eq!(history[0].id(), entry.id());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod filter;
pub mod recorder;
pub mod store;
pub mod taxonomy;

pub use config::{AuditConfig, StoreBackend};
pub use entry::AuditLogEntry;
pub use error::{AuditError, AuditResult, StorageError, ValidationError};
pub use event::{Actor, AuditEvent, RawActor, RawAuditEvent};
pub use filter::AuditFilter;
pub use recorder::AuditRecorder;
pub use store::{AuditStore, EntryStream, JsonlAuditStore, MemoryAuditStore, SqliteAuditStore};
pub use taxonomy::{ActionType, ActorType, AuditStatus, DeprecationPolicy, EntityType};
