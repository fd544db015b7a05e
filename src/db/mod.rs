// Catalog database module

pub mod migrations;
pub mod schema;

use std::path::Path;
use rusqlite::Connection;

use crate::error::Result;

/// Open or create the catalog at the given path
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut conn = Connection::open(db_path)?;

    // Enable foreign keys (must be done per connection)
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    migrations::run_migrations(&mut conn)?;

    log::debug!("Opened catalog {}", db_path.display());
    Ok(conn)
}

/// In-memory catalog with the full schema.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    migrations::run_migrations(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_db_creates_parent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("catalog.db");
        let conn = open_db(&path).unwrap();
        assert!(path.exists());
        assert_eq!(
            migrations::get_schema_version(&conn).unwrap(),
            migrations::latest_version()
        );
    }
}
