// Catalog record types and query helpers

use rusqlite::{Connection, params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::shoot::ShootId;

// ----- Shoot -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    pub id: i64,
    pub name: String,
    pub year: String,
    pub month: String,
    pub day: Option<String>,
    pub size_bytes: Option<i64>,
    pub proxy_present: bool,
    pub created_at: String,
    pub updated_at: String,
}

const SHOOT_COLUMNS: &str =
    "id, name, year, month, day, size_bytes, proxy_present, created_at, updated_at";

fn row_to_shoot(row: &Row) -> rusqlite::Result<Shoot> {
    Ok(Shoot {
        id: row.get(0)?,
        name: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        day: row.get(4)?,
        size_bytes: row.get(5)?,
        proxy_present: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Create the shoot if it is not catalogued yet. Returns its id either way.
pub fn upsert_shoot(conn: &Connection, shoot: &ShootId) -> Result<i64> {
    conn.execute(
        "INSERT INTO shoots (name, year, month, day) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO NOTHING",
        params![shoot.name(), shoot.year(), shoot.month(), shoot.day()],
    )?;
    let id = conn.query_row(
        "SELECT id FROM shoots WHERE name = ?1",
        params![shoot.name()],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_shoot_by_name(conn: &Connection, name: &str) -> Result<Option<Shoot>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM shoots WHERE name = ?1", SHOOT_COLUMNS),
        params![name],
        row_to_shoot,
    ).optional()?;
    Ok(result)
}

pub fn list_shoots(conn: &Connection) -> Result<Vec<Shoot>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM shoots ORDER BY name", SHOOT_COLUMNS))?;
    let shoots = stmt
        .query_map([], row_to_shoot)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(shoots)
}

/// Flag an existing shoot as having a proxy tree. Returns false when no shoot
/// with that name is catalogued; unknown shoots are not created.
pub fn set_proxy_present(conn: &Connection, name: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE shoots SET proxy_present = 1, updated_at = datetime('now') WHERE name = ?1",
        params![name],
    )?;
    Ok(changed > 0)
}

// ----- Volume -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootVolume {
    pub volume: String,
    pub size_bytes: i64,
    pub scanned_at: String,
}

pub fn upsert_volume(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO volumes (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM volumes WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Record that `volume` holds a copy of `shoot` of the given size.
/// Creates the shoot and volume records when missing.
pub fn record_shoot_volume(conn: &Connection, shoot: &ShootId, volume: &str, size_bytes: u64) -> Result<()> {
    let shoot_id = upsert_shoot(conn, shoot)?;
    let volume_id = upsert_volume(conn, volume)?;
    let size = size_bytes as i64;

    conn.execute(
        "INSERT INTO shoot_volumes (shoot_id, volume_id, size_bytes) VALUES (?1, ?2, ?3)
         ON CONFLICT(shoot_id, volume_id) DO UPDATE SET
            size_bytes = excluded.size_bytes,
            scanned_at = datetime('now')",
        params![shoot_id, volume_id, size],
    )?;
    conn.execute(
        "UPDATE shoots SET size_bytes = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![size, shoot_id],
    )?;
    Ok(())
}

pub fn list_shoot_volumes(conn: &Connection, shoot_name: &str) -> Result<Vec<ShootVolume>> {
    let mut stmt = conn.prepare(
        "SELECT v.name, sv.size_bytes, sv.scanned_at
         FROM shoot_volumes sv
         JOIN volumes v ON v.id = sv.volume_id
         JOIN shoots s ON s.id = sv.shoot_id
         WHERE s.name = ?1
         ORDER BY v.name",
    )?;
    let volumes = stmt
        .query_map(params![shoot_name], |row| {
            Ok(ShootVolume {
                volume: row.get(0)?,
                size_bytes: row.get(1)?,
                scanned_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(volumes)
}

// ----- Media file -----

#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub shoot_id: i64,
    pub device: String,
    pub file_name: String,
    pub path: String,
    pub original_name: String,
    pub media_kind: String,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    pub probe_json: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: i64,
    pub shoot_id: i64,
    pub device: String,
    pub file_name: String,
    pub path: String,
    pub original_name: String,
    pub media_kind: String,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    pub probe_json: Option<String>,
}

/// Insert a media file, or refresh the record already stored for its path.
pub fn record_media_file(conn: &Connection, file: &NewMediaFile) -> Result<i64> {
    conn.execute(
        "INSERT INTO media_files
            (shoot_id, device, file_name, path, original_name, media_kind, size_bytes, checksum, probe_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(path) DO UPDATE SET
            shoot_id = excluded.shoot_id,
            device = excluded.device,
            file_name = excluded.file_name,
            original_name = excluded.original_name,
            media_kind = excluded.media_kind,
            size_bytes = excluded.size_bytes,
            checksum = excluded.checksum,
            probe_json = excluded.probe_json,
            updated_at = datetime('now')",
        params![
            file.shoot_id,
            file.device,
            file.file_name,
            file.path,
            file.original_name,
            file.media_kind,
            file.size_bytes,
            file.checksum,
            file.probe_json,
        ],
    )?;
    let id = conn.query_row(
        "SELECT id FROM media_files WHERE path = ?1",
        params![file.path],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn list_media_files(conn: &Connection, shoot_name: &str) -> Result<Vec<MediaFile>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.shoot_id, m.device, m.file_name, m.path, m.original_name,
                m.media_kind, m.size_bytes, m.checksum, m.probe_json
         FROM media_files m
         JOIN shoots s ON s.id = m.shoot_id
         WHERE s.name = ?1
         ORDER BY m.device, m.file_name",
    )?;
    let files = stmt
        .query_map(params![shoot_name], |row| {
            Ok(MediaFile {
                id: row.get(0)?,
                shoot_id: row.get(1)?,
                device: row.get(2)?,
                file_name: row.get(3)?,
                path: row.get(4)?,
                original_name: row.get(5)?,
                media_kind: row.get(6)?,
                size_bytes: row.get(7)?,
                checksum: row.get(8)?,
                probe_json: row.get(9)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(files)
}
