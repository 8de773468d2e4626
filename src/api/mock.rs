use super::{ApiError, Provider};
use crate::models::TrackInfo;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::info;

/// An in-memory provider for tests. It records every id it is asked about
/// and returns canned data or scripted failures.
#[derive(Default)]
pub struct MockProvider {
    tracks: HashMap<String, TrackInfo>,
    albums: HashMap<String, i64>,
    /// Ids that fail this many more times before succeeding.
    failures: Mutex<HashMap<String, u32>>,
    /// Ids that always fail.
    broken: HashSet<String>,
    /// Ids the catalogue refuses outright.
    rejected: HashSet<String>,
    /// When set, `authenticate` fails with this reason.
    auth_failure: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track_popularity(mut self, id: &str, popularity: i64) -> Self {
        self.tracks.insert(
            id.to_string(),
            TrackInfo {
                id: id.to_string(),
                title: format!("mock track {}", id),
                popularity: Some(popularity),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_track(mut self, info: TrackInfo) -> Self {
        self.tracks.insert(info.id.clone(), info);
        self
    }

    pub fn with_album_popularity(mut self, id: &str, popularity: i64) -> Self {
        self.albums.insert(id.to_string(), popularity);
        self
    }

    /// Make lookups of `id` fail `times` times before answering normally.
    pub fn failing(self, id: &str, times: u32) -> Self {
        self.failures
            .lock()
            .expect("mock failures lock")
            .insert(id.to_string(), times);
        self
    }

    /// Make every lookup of `id` fail.
    pub fn broken(mut self, id: &str) -> Self {
        self.broken.insert(id.to_string());
        self
    }

    /// Make every lookup of `id` fail with a permanent 403.
    pub fn rejecting(mut self, id: &str) -> Self {
        self.rejected.insert(id.to_string());
        self
    }

    /// Make `authenticate` fail, as with an unreadable session.
    pub fn unauthenticated(mut self, reason: &str) -> Self {
        self.auth_failure = Some(reason.to_string());
        self
    }

    /// Every id queried so far, in order, including repeated attempts.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    fn record(&self, id: &str) -> Result<()> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push(id.to_string());
        if self.broken.contains(id) {
            return Err(ApiError::Server {
                status: 503,
                body: format!("mock: lookup of {} failed", id),
            }
            .into());
        }
        if self.rejected.contains(id) {
            return Err(ApiError::Rejected {
                status: 403,
                body: format!("mock: {} is not available", id),
            }
            .into());
        }
        let mut failures = self.failures.lock().expect("mock failures lock");
        if let Some(left) = failures.get_mut(id) {
            if *left > 0 {
                *left -= 1;
                return Err(ApiError::Server {
                    status: 503,
                    body: format!("mock: transient failure for {}", id),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    async fn authenticate(&self) -> Result<()> {
        match &self.auth_failure {
            Some(reason) => Err(ApiError::Auth(reason.clone()).into()),
            None => Ok(()),
        }
    }

    async fn track(&self, track_id: &str) -> Result<Option<TrackInfo>> {
        info!("MockProvider: track {}", track_id);
        self.record(track_id)?;
        Ok(self.tracks.get(track_id).cloned())
    }

    async fn album_popularity(&self, album_id: &str) -> Result<Option<i64>> {
        info!("MockProvider: album {}", album_id);
        self.record(album_id)?;
        Ok(self.albums.get(album_id).copied())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackInfo>> {
        info!("MockProvider: search {}", query);
        let q = query.to_lowercase();
        let mut hits: Vec<TrackInfo> = self
            .tracks
            .values()
            .filter(|t| t.title.to_lowercase().contains(&q))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits)
    }
}
