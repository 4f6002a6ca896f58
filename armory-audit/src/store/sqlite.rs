//! SQLite audit store

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::migrations::Migrator;
use super::{AuditStore, EntryStream};
use crate::entry::AuditLogEntry;
use crate::error::StorageError;
use crate::event::{Actor, AuditEvent};
use crate::filter::AuditFilter;
use crate::taxonomy::{ActionType, ActorType, AuditStatus, EntityType};

const SELECT_COLUMNS: &str = "seq, id, timestamp_us, actor_id, actor_name, actor_type, action_type,
    entity_type, entity_id, status, details, previous_details, error_message";

/// SQLite-backed audit store.
///
/// Insertion order comes from the `seq` autoincrement key, and triggers make
/// the table reject UPDATE and DELETE.
pub struct SqliteAuditStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditStore {
    /// Open or create a database at path with full durability
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::open_with(path, true)
    }

    /// Open or create a database at path. With `fsync` off, SQLite syncs
    /// less often and a power loss may drop the most recent entries.
    pub fn open_with<P: AsRef<Path>>(path: P, fsync: bool) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // WAL lets readers proceed while an append is in progress
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", if fsync { "FULL" } else { "NORMAL" })?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        Migrator::new(&conn).migrate()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("sqlite connection lock poisoned".into()))?;
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("sqlite task failed: {}", e)))?
    }
}

fn insert_entry(conn: &Connection, entry: &AuditLogEntry) -> Result<(), StorageError> {
    let event = entry.event();
    let details = event.details.as_ref().map(serde_json::to_string).transpose()?;
    let previous = event
        .previous_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO audit_log (id, timestamp_us, actor_id, actor_name, actor_type, action_type,
                                entity_type, entity_id, status, details, previous_details, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            entry.id().to_string(),
            entry.timestamp().timestamp_micros(),
            event.actor.id,
            event.actor.name,
            event.actor.actor_type.as_str(),
            event.action_type.as_str(),
            event.entity_type.as_str(),
            event.entity_id,
            event.status.as_str(),
            details,
            previous,
            event.error_message,
        ],
    )?;
    Ok(())
}

fn select_entries(
    conn: &Connection,
    filter: &AuditFilter,
) -> Result<Vec<Result<AuditLogEntry, StorageError>>, StorageError> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(entity_type) = filter.entity_type {
        conditions.push(format!("entity_type = ?{}", params.len() + 1));
        params.push(Box::new(entity_type.as_str()));
    }

    if let Some(ref entity_id) = filter.entity_id {
        conditions.push(format!("entity_id = ?{}", params.len() + 1));
        params.push(Box::new(entity_id.clone()));
    }

    if let Some(ref actor_id) = filter.actor_id {
        conditions.push(format!("actor_id = ?{}", params.len() + 1));
        params.push(Box::new(actor_id.clone()));
    }

    if let Some(action_type) = filter.action_type {
        conditions.push(format!("action_type = ?{}", params.len() + 1));
        params.push(Box::new(action_type.as_str()));
    }

    if let Some(status) = filter.status {
        conditions.push(format!("status = ?{}", params.len() + 1));
        params.push(Box::new(status.as_str()));
    }

    if let Some(from) = filter.from {
        conditions.push(format!("timestamp_us >= ?{}", params.len() + 1));
        params.push(Box::new(from.timestamp_micros()));
    }

    if let Some(to) = filter.to {
        conditions.push(format!("timestamp_us <= ?{}", params.len() + 1));
        params.push(Box::new(to.timestamp_micros()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let limit_clause = match filter.limit {
        Some(limit) => {
            params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
            format!("LIMIT ?{}", params.len())
        }
        None => String::new(),
    };

    let sql = format!(
        "SELECT {} FROM audit_log {} ORDER BY seq ASC {}",
        SELECT_COLUMNS, where_clause, limit_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), StoredRow::from_row)?;

    Ok(rows
        .map(|row| row.map_err(StorageError::from).and_then(StoredRow::into_entry))
        .collect())
}

/// Raw column values, converted after the statement is done so taxonomy
/// mismatches surface as `StorageError::Corrupt`
struct StoredRow {
    seq: i64,
    id: String,
    timestamp_us: i64,
    actor_id: String,
    actor_name: String,
    actor_type: String,
    action_type: String,
    entity_type: String,
    entity_id: Option<String>,
    status: String,
    details: Option<String>,
    previous_details: Option<String>,
    error_message: Option<String>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            timestamp_us: row.get(2)?,
            actor_id: row.get(3)?,
            actor_name: row.get(4)?,
            actor_type: row.get(5)?,
            action_type: row.get(6)?,
            entity_type: row.get(7)?,
            entity_id: row.get(8)?,
            status: row.get(9)?,
            details: row.get(10)?,
            previous_details: row.get(11)?,
            error_message: row.get(12)?,
        })
    }

    fn into_entry(self) -> Result<AuditLogEntry, StorageError> {
        let line = u64::try_from(self.seq).unwrap_or_default();
        let corrupt = |reason: String| StorageError::Corrupt { line, reason };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(self.timestamp_us)
            .ok_or_else(|| corrupt(format!("timestamp out of range: {}", self.timestamp_us)))?;

        let actor_type = ActorType::parse(&self.actor_type)
            .ok_or_else(|| corrupt(format!("unknown actor type {:?}", self.actor_type)))?;
        let action_type = ActionType::parse(&self.action_type)
            .ok_or_else(|| corrupt(format!("unknown action type {:?}", self.action_type)))?;
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| corrupt(format!("unknown entity type {:?}", self.entity_type)))?;
        let status = AuditStatus::parse(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status {:?}", self.status)))?;

        let details = parse_payload(self.details).map_err(|e| corrupt(e.to_string()))?;
        let previous_details =
            parse_payload(self.previous_details).map_err(|e| corrupt(e.to_string()))?;

        let event = AuditEvent {
            actor: Actor {
                id: self.actor_id,
                name: self.actor_name,
                actor_type,
            },
            action_type,
            entity_type,
            entity_id: self.entity_id,
            status,
            details,
            previous_details,
            error_message: self.error_message,
        };
        Ok(AuditLogEntry::from_parts(id, timestamp, event))
    }
}

fn parse_payload(raw: Option<String>) -> Result<Option<serde_json::Value>, serde_json::Error> {
    raw.map(|text| serde_json::from_str(&text)).transpose()
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        let entry = entry.clone();
        self.with_conn(move |conn| insert_entry(conn, &entry)).await?;
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<EntryStream, StorageError> {
        let filter = filter.clone();
        let rows = self
            .with_conn(move |conn| select_entries(conn, &filter))
            .await?;
        Ok(Box::pin(tokio_stream::iter(rows)))
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
