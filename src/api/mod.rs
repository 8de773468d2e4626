pub mod error;
pub mod mock;
pub mod session;
pub mod tidal;
pub mod tidal_auth;

pub use error::ApiError;

use crate::models::TrackInfo;
use anyhow::Result;

/// Provider trait: the catalogue operations the sync and lookup helpers need.
/// Implementations: tidal::TidalProvider and mock::MockProvider.
///
/// `Ok(None)` means the catalogue answered but has nothing for that id;
/// `Err` means the request itself failed; an `ApiError` inside tells the
/// caller whether retrying makes sense.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Make sure a usable token is at hand before any lookup is made.
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch track metadata by catalogue id.
    async fn track(&self, track_id: &str) -> Result<Option<TrackInfo>>;

    /// Popularity (0..=100) of a track. Defaults to a full track lookup.
    async fn track_popularity(&self, track_id: &str) -> Result<Option<i64>> {
        Ok(self.track(track_id).await?.and_then(|t| t.popularity))
    }

    /// Popularity (0..=100) of an album. Default implementation returns None.
    async fn album_popularity(&self, _album_id: &str) -> Result<Option<i64>> {
        Ok(None)
    }

    /// Free-text track search, best match first.
    async fn search_tracks(&self, _query: &str) -> Result<Vec<TrackInfo>> {
        Ok(Vec::new())
    }

    /// Return the provider's name (for logging)
    fn name(&self) -> &str;

    /// Return true if the provider has what it needs to obtain a token
    fn is_authenticated(&self) -> bool;
}
