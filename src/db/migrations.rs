// Catalog migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;
use crate::error::{Result, ShootError};

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: shoots, volumes, media files
    r#"
    CREATE TABLE shoots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        year TEXT NOT NULL,
        month TEXT NOT NULL,
        day TEXT,
        size_bytes INTEGER,
        proxy_present INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE volumes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE shoot_volumes (
        shoot_id INTEGER NOT NULL REFERENCES shoots(id) ON DELETE CASCADE,
        volume_id INTEGER NOT NULL REFERENCES volumes(id) ON DELETE CASCADE,
        size_bytes INTEGER NOT NULL,
        scanned_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (shoot_id, volume_id)
    );

    CREATE TABLE media_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        shoot_id INTEGER NOT NULL REFERENCES shoots(id) ON DELETE CASCADE,
        device TEXT NOT NULL,
        file_name TEXT NOT NULL,
        path TEXT NOT NULL UNIQUE,
        original_name TEXT NOT NULL,
        media_kind TEXT NOT NULL CHECK (media_kind IN ('video', 'audio', 'image', 'unknown')),
        size_bytes INTEGER NOT NULL,
        checksum TEXT,
        probe_json TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: lookup indexes
    r#"
    CREATE INDEX idx_media_files_shoot ON media_files(shoot_id);
    CREATE INDEX idx_shoot_volumes_volume ON shoot_volumes(volume_id);
    "#,
];

/// Get current schema version from database
pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Run all pending migrations, each in its own transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = latest_version();

    if current_version > target_version {
        return Err(ShootError::Config(format!(
            "Catalog schema version {} is newer than this build supports (max {})",
            current_version, target_version
        )));
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;
        tx.commit()?;

        log::info!("Applied catalog migration {}", migration_version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());

        run_migrations(&mut conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 999").unwrap();
        assert!(matches!(run_migrations(&mut conn), Err(ShootError::Config(_))));
    }
}
