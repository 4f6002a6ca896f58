//! Immutable audit log entries

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::AuditEvent;

/// A recorded audit event.
///
/// Entries are only produced by the recorder (or read back from a store) and
/// expose no mutators. Timestamps are kept at microsecond precision so every
/// backend stores them losslessly, rounded up so an entry is never stamped
/// before the moment it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: AuditEvent,
}

impl AuditLogEntry {
    /// Stamp an event with a fresh id and the current time
    pub(crate) fn from_event(event: AuditEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: now_micros(),
            event,
        }
    }

    /// Rebuild an entry read back from a store
    pub(crate) fn from_parts(id: Uuid, timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id,
            timestamp,
            event,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The fields the caller submitted
    pub fn event(&self) -> &AuditEvent {
        &self.event
    }

    pub fn into_event(self) -> AuditEvent {
        self.event
    }

    pub fn is_failure(&self) -> bool {
        self.event.status == crate::AuditStatus::Failure
    }
}

/// Current time rounded up to the next whole microsecond
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    let truncated = now.trunc_subsecs(6);
    if truncated < now {
        truncated + Duration::microseconds(1)
    } else {
        truncated
    }
}
