use crate::db;
use crate::models::{Album, FieldValue, Track};
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

/// Access to the host's library records.
///
/// The sync never touches storage directly; it reads records and writes
/// fields through this trait so the host store can be swapped out.
pub trait Library {
    fn tracks(&self) -> Result<Vec<Track>>;

    fn albums(&self) -> Result<Vec<Album>>;

    fn track(&self, id: i64) -> Result<Option<Track>>;

    /// Set fields on one track. All fields are persisted together or not at all.
    fn set_item_fields(&mut self, id: i64, fields: &[(&str, FieldValue)]) -> Result<()>;

    fn set_album_fields(&mut self, id: i64, fields: &[(&str, FieldValue)]) -> Result<()>;
}

/// A beets `library.db`.
pub struct BeetsLibrary {
    conn: Connection,
}

impl BeetsLibrary {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: db::open_existing(path)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Library for BeetsLibrary {
    fn tracks(&self) -> Result<Vec<Track>> {
        db::fetch_items(&self.conn)
    }

    fn albums(&self) -> Result<Vec<Album>> {
        db::fetch_albums(&self.conn)
    }

    fn track(&self, id: i64) -> Result<Option<Track>> {
        db::fetch_item(&self.conn, id)
    }

    fn set_item_fields(&mut self, id: i64, fields: &[(&str, FieldValue)]) -> Result<()> {
        db::set_item_fields(&mut self.conn, id, fields)
    }

    fn set_album_fields(&mut self, id: i64, fields: &[(&str, FieldValue)]) -> Result<()> {
        db::set_album_fields(&mut self.conn, id, fields)
    }
}
