//! Schema migrations for the SQLite audit store

use rusqlite::Connection;

use crate::error::StorageError;

/// SQL for each migration version
const MIGRATIONS: &[(&str, &str)] = &[
    ("v001_audit_log", include_str!("v001_audit_log.sql")),
    ("v002_append_only_guards", include_str!("v002_append_only_guards.sql")),
];

/// Runs database migrations, tracking progress in `PRAGMA user_version`
pub struct Migrator<'a> {
    conn: &'a Connection,
}

impl<'a> Migrator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn current_version(&self) -> Result<i32, StorageError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    fn set_version(&self, version: i32) -> Result<(), StorageError> {
        self.conn.pragma_update(None, "user_version", version)?;
        Ok(())
    }

    /// Run all pending migrations
    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.current_version()?;
        let target = self.target_version();

        if current > target {
            return Err(StorageError::Migration(format!(
                "database schema version {} is newer than supported version {}",
                current, target
            )));
        }

        for (idx, (name, sql)) in MIGRATIONS.iter().enumerate() {
            let version = (idx + 1) as i32;
            if version > current {
                tracing::info!("Running audit migration {}: {}", version, name);
                self.conn
                    .execute_batch(sql)
                    .map_err(|e| StorageError::Migration(format!("{}: {}", name, e)))?;
                self.set_version(version)?;
            }
        }

        Ok(())
    }

    pub fn target_version(&self) -> i32 {
        MIGRATIONS.len() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&conn);

        assert_eq!(migrator.current_version().unwrap(), 0);
        migrator.migrate().unwrap();
        assert_eq!(
            migrator.current_version().unwrap(),
            migrator.target_version()
        );
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&conn);

        migrator.migrate().unwrap();
        migrator.migrate().unwrap();
        assert_eq!(migrator.current_version().unwrap(), 2);
    }

    #[test]
    fn test_refuses_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();

        let err = Migrator::new(&conn).migrate().unwrap_err();
        assert!(matches!(err, StorageError::Migration(_)));
    }

    #[test]
    fn test_triggers_block_update_and_delete() {
        let conn = Connection::open_in_memory().unwrap();
        Migrator::new(&conn).migrate().unwrap();

        conn.execute(
            "INSERT INTO audit_log (id, timestamp_us, actor_id, actor_name, actor_type, action_type, entity_type, status)
             VALUES ('a', 0, 'u1', 'Admin', 'USER', 'CREATE', 'Depot', 'SUCCESS')",
            [],
        )
        .unwrap();

        let update = conn.execute("UPDATE audit_log SET status = 'FAILURE'", []);
        assert!(update.is_err());
        let delete = conn.execute("DELETE FROM audit_log", []);
        assert!(delete.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
