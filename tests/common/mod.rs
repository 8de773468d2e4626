#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::Path;

/// The subset of the beets schema the crate reads and writes.
pub const BEETS_SCHEMA: &str = r#"
CREATE TABLE items (
    id INTEGER PRIMARY KEY,
    path BLOB,
    album_id INTEGER,
    title TEXT,
    artist TEXT,
    album TEXT,
    mb_trackid TEXT
);
CREATE TABLE item_attributes (
    id INTEGER PRIMARY KEY,
    entity_id INTEGER,
    key TEXT,
    value TEXT,
    UNIQUE(entity_id, key) ON CONFLICT REPLACE
);
CREATE TABLE albums (
    id INTEGER PRIMARY KEY,
    album TEXT,
    albumartist TEXT,
    mb_albumid TEXT
);
CREATE TABLE album_attributes (
    id INTEGER PRIMARY KEY,
    entity_id INTEGER,
    key TEXT,
    value TEXT,
    UNIQUE(entity_id, key) ON CONFLICT REPLACE
);
"#;

pub fn create_library(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("open library");
    conn.execute_batch(BEETS_SCHEMA).expect("create schema");
    conn
}

pub fn add_item(conn: &Connection, id: i64, title: &str) {
    conn.execute(
        "INSERT INTO items (id, path, title, artist, album) VALUES (?1, ?2, ?3, 'Artist', 'Album')",
        params![id, format!("/music/{}.flac", title).into_bytes(), title],
    )
    .expect("insert item");
}

pub fn set_item_attr<T: rusqlite::ToSql>(conn: &Connection, id: i64, key: &str, value: T) {
    conn.execute(
        "INSERT INTO item_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)",
        params![id, key, value],
    )
    .expect("insert item attribute");
}

pub fn add_album(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO albums (id, album, albumartist) VALUES (?1, ?2, 'Album Artist')",
        params![id, name],
    )
    .expect("insert album");
}

pub fn set_album_attr<T: rusqlite::ToSql>(conn: &Connection, id: i64, key: &str, value: T) {
    conn.execute(
        "INSERT INTO album_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)",
        params![id, key, value],
    )
    .expect("insert album attribute");
}

pub fn item_attr(conn: &Connection, id: i64, key: &str) -> Option<rusqlite::types::Value> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        "SELECT value FROM item_attributes WHERE entity_id = ?1 AND key = ?2",
        params![id, key],
        |r| r.get(0),
    )
    .optional()
    .expect("query item attribute")
}

pub fn album_attr(conn: &Connection, id: i64, key: &str) -> Option<rusqlite::types::Value> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        "SELECT value FROM album_attributes WHERE entity_id = ?1 AND key = ?2",
        params![id, key],
        |r| r.get(0),
    )
    .optional()
    .expect("query album attribute")
}
