use rusqlite::{Connection, Result};
use std::sync::{Mutex, MutexGuard};

use crate::db::migration_runner::MigrationRunner;
use crate::error::AppError;

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::initialize(conn, db_path)
    }

    /// Private, fully migrated database that lives as long as the handle
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?, ":memory:")
    }

    fn initialize(conn: Connection, db_path: &str) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        // WAL is meaningless for in-memory databases and reports "memory" there
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let runner = MigrationRunner::new();

        log::info!("=== Starting database migration check ===");

        let applied = runner.run_pending_migrations(&conn, db_path)?;
        if applied > 0 {
            log::info!("Applied {} migrations successfully", applied);
        } else {
            log::info!("Database schema is up to date");
        }

        runner.verify_migrations(&conn)?;

        if let Some(version) = runner.get_current_version(&conn)? {
            log::info!("Final schema version: {}", version);
        }

        log::info!("=== Migration check complete ===");

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|e| AppError::Internal(format!("database lock poisoned: {}", e)))
    }
}
