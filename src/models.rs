
/// Flexible attribute holding the Tidal track id.
pub const TRACK_ID_FIELD: &str = "tidal_track_id";
pub const TRACK_POPULARITY_FIELD: &str = "tidal_track_popularity";
pub const ALBUM_ID_FIELD: &str = "tidal_album_id";
pub const ALBUM_POPULARITY_FIELD: &str = "tidal_alb_popularity";
pub const UPDATED_FIELD: &str = "tidal_updated";

/// A library item as far as this crate is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album_id: Option<i64>,
    pub tidal_id: Option<String>,
    pub popularity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: i64,
    pub album: String,
    pub albumartist: String,
    pub tidal_id: Option<String>,
    pub popularity: Option<i64>,
}

/// Track metadata as returned by the catalogue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub isrc: Option<String>,
    /// Length in seconds.
    pub length: Option<u64>,
    pub popularity: Option<i64>,
    pub explicit: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl rusqlite::ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            FieldValue::Integer(i) => i.to_sql(),
            FieldValue::Real(f) => f.to_sql(),
            FieldValue::Text(s) => s.to_sql(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Overwrite popularity values that are already present.
    pub force: bool,
    /// Also sync album popularity.
    pub albums: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub examined: usize,
    pub updated: usize,
    pub skipped_no_id: usize,
    pub skipped_existing: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        self.examined += other.examined;
        self.updated += other.updated;
        self.skipped_no_id += other.skipped_no_id;
        self.skipped_existing += other.skipped_existing;
        self.not_found += other.not_found;
        self.failed += other.failed;
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "examined {} | updated {} | no tidal id {} | already set {} | not found {} | failed {}",
            self.examined,
            self.updated,
            self.skipped_no_id,
            self.skipped_existing,
            self.not_found,
            self.failed
        )
    }
}
