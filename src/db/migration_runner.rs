use rusqlite::{params, Connection, OptionalExtension, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const BACKUPS_KEPT: usize = 5;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn new(version: u32, name: &'static str, sql: &'static str) -> Self {
        Self { version, name, sql }
    }
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    pub fn new() -> Self {
        Self {
            migrations: Self::collect_migrations(),
        }
    }

    fn collect_migrations() -> Vec<Migration> {
        vec![
            Migration::new(0, "bootstrap", include_str!("migrations/000_bootstrap.sql")),
            Migration::new(1, "initial_schema", include_str!("migrations/001_initial_schema.sql")),
            Migration::new(2, "add_setup_tags", include_str!("migrations/002_add_setup_tags.sql")),
            Migration::new(
                3,
                "add_emotion_and_images",
                include_str!("migrations/003_add_emotion_and_images.sql"),
            ),
        ]
    }

    /// Applies every migration newer than the recorded schema version.
    /// `db_path` is used to take a backup first; in-memory databases are not backed up.
    pub fn run_pending_migrations(&self, conn: &Connection, db_path: &str) -> Result<usize> {
        if !self.has_schema_migrations_table(conn)? {
            log::info!("Fresh database - creating migration table");
            self.apply_migration(conn, &self.migrations[0])?;
        }

        let current_version = self.get_current_version(conn)?;
        log::info!("Current schema version: {:?}", current_version);

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| match current_version {
                Some(v) => m.version > v,
                None => m.version > 0,
            })
            .collect();

        let Some(target) = pending.last() else {
            return Ok(0);
        };

        log::info!("Found {} pending migrations", pending.len());

        // Only databases that already hold data are worth a backup
        let backup_path = if current_version.unwrap_or(0) > 0 && !is_in_memory(db_path) {
            let path = self.create_backup(db_path, target.version)?;
            log::info!("Backup created: {}", path.display());
            Some(path)
        } else {
            None
        };

        let mut applied = 0;
        for migration in pending {
            if let Err(e) = self.apply_migration(conn, migration) {
                log::error!("Migration {} ({}) failed: {}", migration.version, migration.name, e);
                log::error!("Migration stopped. Database rolled back to before this migration.");
                if let Some(path) = &backup_path {
                    log::error!("Backup available at: {}", path.display());
                }
                return Err(e);
            }
            applied += 1;
        }

        Ok(applied)
    }

    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> Result<()> {
        let start = SystemTime::now();

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;

        let execution_time = start.elapsed().map(|d| d.as_millis() as i64).unwrap_or(0);

        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, notes)
             VALUES (?, ?, ?, ?, ?, NULL)",
            params![
                migration.version,
                migration.name,
                current_timestamp(),
                migration.checksum(),
                execution_time
            ],
        )?;

        tx.commit()?;

        log::info!(
            "Applied migration {}: {} in {}ms",
            migration.version,
            migration.name,
            execution_time
        );

        Ok(())
    }

    /// Fails when an applied migration's SQL no longer matches its recorded checksum
    pub fn verify_migrations(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT version, name, checksum FROM schema_migrations WHERE checksum IS NOT NULL ORDER BY version",
        )?;

        let applied: Vec<(u32, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>>>()?;

        for (version, name, stored_checksum) in applied {
            let Some(migration) = self.migrations.iter().find(|m| m.version == version) else {
                continue;
            };

            let expected_checksum = migration.checksum();
            if stored_checksum != expected_checksum {
                log::error!("Checksum mismatch for migration {} ({})", version, name);
                log::error!("Expected: {}", expected_checksum);
                log::error!("Actual:   {}", stored_checksum);
                log::error!("The migration file was modified after it was applied; restore it or use a backup.");
                return Err(rusqlite::Error::InvalidQuery);
            }
        }

        Ok(())
    }

    pub fn get_current_version(&self, conn: &Connection) -> Result<Option<u32>> {
        if !self.has_schema_migrations_table(conn)? {
            return Ok(None);
        }

        let version: Option<Option<u32>> = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .optional()?;

        Ok(version.flatten())
    }

    fn create_backup(&self, db_path: &str, target_version: u32) -> Result<PathBuf> {
        let db_path_buf = PathBuf::from(db_path);
        let db_dir = match db_path_buf.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let backup_dir = db_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(|e| io_failure("Failed to create backup directory", e))?;

        let backup_name = format!("pre_migration_v{}_{}.db", target_version, current_timestamp());
        let backup_path = backup_dir.join(&backup_name);

        let src = Connection::open(db_path)?;
        let mut dst = Connection::open(&backup_path)?;

        {
            let backup = rusqlite::backup::Backup::new(&src, &mut dst)?;
            backup.run_to_completion(5, std::time::Duration::from_millis(250), None)?;
        }

        let integrity: String = dst.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if integrity != "ok" {
            log::error!("Backup integrity check failed: {}", integrity);
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(format!("Backup integrity check failed: {}", integrity)),
            ));
        }

        self.cleanup_old_backups(&backup_dir)?;

        Ok(backup_path)
    }

    fn cleanup_old_backups(&self, backup_dir: &Path) -> Result<()> {
        let mut backups: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| io_failure("Failed to read backup directory", e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|s| s.to_str()) == Some("db")
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|s| s.starts_with("pre_migration_"))
            })
            .collect();

        // Oldest first
        backups.sort_by_key(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        });

        if backups.len() > BACKUPS_KEPT {
            for entry in backups.iter().take(backups.len() - BACKUPS_KEPT) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    log::warn!("Failed to delete old backup: {}", e);
                }
            }
        }

        Ok(())
    }

    fn has_schema_migrations_table(&self, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn is_in_memory(db_path: &str) -> bool {
    db_path == ":memory:" || db_path.starts_with("file::memory:")
}

fn io_failure(context: &str, err: std::io::Error) -> rusqlite::Error {
    log::error!("{}: {}", context, err);
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some(format!("{}: {}", context, err)))
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                params![table],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_migrations_are_sequential() {
        let runner = MigrationRunner::new();
        for (i, m) in runner.migrations.iter().enumerate() {
            assert_eq!(m.version as usize, i, "Migration versions must be sequential");
        }
    }

    #[test]
    fn test_all_migrations_have_valid_sql() {
        let runner = MigrationRunner::new();
        let conn = Connection::open_in_memory().unwrap();

        for migration in &runner.migrations {
            conn.execute_batch(migration.sql)
                .unwrap_or_else(|_| panic!("Migration {} has invalid SQL", migration.name));
        }
    }

    #[test]
    fn test_fresh_install() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();

        let applied = runner.run_pending_migrations(&conn, ":memory:").unwrap();
        assert_eq!(applied, runner.migrations.len() - 1);

        for table in ["schema_migrations", "trades", "rules"] {
            assert!(table_exists(&conn, table), "Table {} should exist", table);
        }
        assert_eq!(runner.get_current_version(&conn).unwrap(), Some(3));
    }

    #[test]
    fn test_idempotency() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();

        assert!(runner.run_pending_migrations(&conn, ":memory:").unwrap() > 0);
        assert_eq!(
            runner.run_pending_migrations(&conn, ":memory:").unwrap(),
            0,
            "Should not apply any migrations on second run"
        );
    }

    #[test]
    fn test_migration_checksums() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();
        runner.run_pending_migrations(&conn, ":memory:").unwrap();

        assert!(runner.verify_migrations(&conn).is_ok());

        conn.execute(
            "UPDATE schema_migrations SET checksum = 'tampered' WHERE version = 1",
            [],
        )
        .unwrap();
        assert!(runner.verify_migrations(&conn).is_err());
    }

    #[test]
    fn test_failed_migration_rollback() {
        let conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new();
        runner.apply_migration(&conn, &runner.migrations[0]).unwrap();
        runner.apply_migration(&conn, &runner.migrations[1]).unwrap();

        let bad_migration = Migration::new(2, "bad_migration", "INVALID SQL SYNTAX");
        assert!(runner.apply_migration(&conn, &bad_migration).is_err());

        assert_eq!(
            runner.get_current_version(&conn).unwrap(),
            Some(1),
            "Version should still be 1 after failed migration"
        );
    }

    #[test]
    fn test_upgrade_takes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("journal.db");
        let db_path = db_path.to_str().unwrap();

        {
            let conn = Connection::open(db_path).unwrap();
            let runner = MigrationRunner::new();
            runner.apply_migration(&conn, &runner.migrations[0]).unwrap();
            runner.apply_migration(&conn, &runner.migrations[1]).unwrap();
        }

        let conn = Connection::open(db_path).unwrap();
        let applied = MigrationRunner::new().run_pending_migrations(&conn, db_path).unwrap();
        assert_eq!(applied, 2);

        let backups: Vec<_> = fs::read_dir(dir.path().join("backups")).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }
}
