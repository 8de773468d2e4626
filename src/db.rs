use crate::models::{Album, FieldValue, Track, ALBUM_ID_FIELD, ALBUM_POPULARITY_FIELD, TRACK_ID_FIELD, TRACK_POPULARITY_FIELD};
use anyhow::{anyhow, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// Open an existing beets library. The library is owned by beets, so a
/// missing file is an error rather than a reason to create one.
pub fn open_existing(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(anyhow!("beets library not found at {}", path.display()));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .with_context(|| format!("opening beets library {}", path.display()))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Flexible attribute values are untyped in beets; ids may be stored as
/// numbers or text depending on which plugin wrote them.
fn value_to_id(v: Option<Value>) -> Option<String> {
    match v? {
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) if f.fract() == 0.0 => Some((f as i64).to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Blob(b) => String::from_utf8(b).ok().filter(|s| !s.trim().is_empty()),
        Value::Null => None,
    }
}

fn value_to_int(v: Option<Value>) -> Option<i64> {
    match v? {
        Value::Integer(i) => Some(i),
        Value::Real(f) => Some(f.round() as i64),
        Value::Text(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

/// Pick the Tidal id: the dedicated flexible attribute first, then the
/// generic MusicBrainz-style id column when the item was matched via Tidal.
fn resolve_tidal_id(flex: Option<Value>, data_source: Option<Value>, mb_id: Option<Value>) -> Option<String> {
    if let Some(id) = value_to_id(flex) {
        return Some(id);
    }
    let from_tidal = value_to_id(data_source)
        .map(|s| s.eq_ignore_ascii_case("tidal"))
        .unwrap_or(false);
    if from_tidal {
        value_to_id(mb_id)
    } else {
        None
    }
}

const ITEM_SELECT: &str = "SELECT i.id, i.title, i.artist, i.album_id, i.mb_trackid, \
    (SELECT value FROM item_attributes WHERE entity_id = i.id AND key = ?1), \
    (SELECT value FROM item_attributes WHERE entity_id = i.id AND key = ?2), \
    (SELECT value FROM item_attributes WHERE entity_id = i.id AND key = 'data_source') \
    FROM items i";

fn row_to_track(r: &rusqlite::Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: r.get(0)?,
        title: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
        artist: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
        album_id: r.get(3)?,
        tidal_id: resolve_tidal_id(r.get(5)?, r.get(7)?, r.get(4)?),
        popularity: value_to_int(r.get(6)?),
    })
}

pub fn fetch_items(conn: &Connection) -> Result<Vec<Track>> {
    let sql = format!("{} ORDER BY i.id ASC", ITEM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![TRACK_ID_FIELD, TRACK_POPULARITY_FIELD], row_to_track)?;
    let mut v = Vec::new();
    for r in rows {
        v.push(r?);
    }
    Ok(v)
}

pub fn fetch_item(conn: &Connection, id: i64) -> Result<Option<Track>> {
    let sql = format!("{} WHERE i.id = ?3 LIMIT 1", ITEM_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![TRACK_ID_FIELD, TRACK_POPULARITY_FIELD, id], row_to_track)
        .optional()?;
    Ok(row)
}

pub fn fetch_albums(conn: &Connection) -> Result<Vec<Album>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.album, a.albumartist, a.mb_albumid, \
         (SELECT value FROM album_attributes WHERE entity_id = a.id AND key = ?1), \
         (SELECT value FROM album_attributes WHERE entity_id = a.id AND key = ?2), \
         (SELECT value FROM album_attributes WHERE entity_id = a.id AND key = 'data_source') \
         FROM albums a ORDER BY a.id ASC",
    )?;
    let rows = stmt.query_map(params![ALBUM_ID_FIELD, ALBUM_POPULARITY_FIELD], |r| {
        Ok(Album {
            id: r.get(0)?,
            album: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
            albumartist: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
            tidal_id: resolve_tidal_id(r.get(4)?, r.get(6)?, r.get(3)?),
            popularity: value_to_int(r.get(5)?),
        })
    })?;
    let mut v = Vec::new();
    for r in rows {
        v.push(r?);
    }
    Ok(v)
}

fn entity_exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1 LIMIT 1", table);
    Ok(conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Write several flexible attributes of one record in a single transaction.
fn set_flex_fields(
    conn: &mut Connection,
    entity_table: &str,
    attr_table: &str,
    id: i64,
    fields: &[(&str, FieldValue)],
) -> Result<()> {
    if !entity_exists(conn, entity_table, id)? {
        return Err(anyhow!("no {} row with id {}", entity_table, id));
    }
    let sql = format!(
        "INSERT OR REPLACE INTO {} (entity_id, key, value) VALUES (?1, ?2, ?3)",
        attr_table
    );
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for (key, value) in fields {
            stmt.execute(params![id, key, value])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn set_item_fields(conn: &mut Connection, id: i64, fields: &[(&str, FieldValue)]) -> Result<()> {
    set_flex_fields(conn, "items", "item_attributes", id, fields)
}

pub fn set_album_fields(conn: &mut Connection, id: i64, fields: &[(&str, FieldValue)]) -> Result<()> {
    set_flex_fields(conn, "albums", "album_attributes", id, fields)
}
