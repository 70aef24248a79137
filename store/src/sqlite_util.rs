//! Secure SQLite file creation and schema migrations.

use rusqlite::Connection;
use std::fs::OpenOptions;
use std::path::Path;

use crate::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "
        CREATE TABLE users (
            email         TEXT PRIMARY KEY NOT NULL,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        CREATE TABLE tasks (
            owner        TEXT NOT NULL REFERENCES users(email) ON DELETE CASCADE,
            id           TEXT NOT NULL,
            text         TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            date         TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            PRIMARY KEY (owner, id)
        );
        CREATE INDEX idx_tasks_owner_date ON tasks(owner, date);
        CREATE TABLE habits (
            owner           TEXT NOT NULL REFERENCES users(email) ON DELETE CASCADE,
            id              TEXT NOT NULL,
            name            TEXT NOT NULL,
            completed_dates TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (owner, id)
        );
    ",
}];

#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Apply pending migrations in one transaction, mirroring the applied
/// version into `PRAGMA user_version`.
pub(crate) fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(StoreError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;
    tracing::info!(from = current, to = latest, "Applied schema migrations");
    Ok(())
}

/// Open a SQLite database at `path`, creating the parent directory
/// (owner-only on Unix) and the file (0o600 on Unix) if needed.
pub(crate) fn open_secure_db(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_secure_dir(parent)?;
    }
    ensure_secure_db_file(path)?;
    Ok(Connection::open(path)?)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn ensure_secure_dir(path: &Path) -> StoreResult<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};
        let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;

        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() != our_uid {
            return Ok(());
        }

        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| io_error(path, e))?;
        }
    }
    Ok(())
}

fn ensure_secure_db_file(path: &Path) -> StoreResult<()> {
    if !path.exists() {
        let mut options = OpenOptions::new();
        options.create(true).truncate(false).read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path).map_err(|e| io_error(path, e))?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedSchemaVersion { db_version: 99, .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn database_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("focus.db");
        let _conn = open_secure_db(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
