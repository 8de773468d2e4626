use super::error::{api_error, ApiError};
use super::session::{self, Session};
use super::Provider;
use crate::config::Config;
use crate::models::TrackInfo;
use crate::util::{normalize_popularity, parse_iso_duration};
use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use std::path::PathBuf;

/// Tidal catalogue provider over the JSON:API v2 endpoints.
///
/// Base URLs come from the config (defaulting to the `TIDAL_API_BASE` and
/// `TIDAL_AUTH_BASE` env vars, then the official hosts) so tests can point
/// them at a mock server.
pub struct TidalProvider {
    client: Client,
    api_base: String,
    auth_base: String,
    country_code: String,
    client_id: String,
    client_secret: String,
    session_file: PathBuf,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl TidalProvider {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            api_base: cfg.tidal.api_base.trim_end_matches('/').to_string(),
            auth_base: cfg.tidal.auth_base.trim_end_matches('/').to_string(),
            country_code: cfg.tidal.country_code.clone(),
            client_id: cfg.tidal.client_id.clone(),
            client_secret: cfg.tidal.client_secret.clone(),
            session_file: cfg.session_path(),
            session: tokio::sync::Mutex::new(None),
        }
    }

    fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    fn basic_auth(&self) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", self.client_id, self.client_secret))
        )
    }

    async fn request_token(&self, form: &[(&str, &str)], previous_refresh: Option<String>) -> Result<Session> {
        let url = format!("{}/v1/oauth2/token", self.auth_base);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.basic_auth())
            .form(form)
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited(&resp).into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ApiError::from_status(status, body).into());
            }
            return Err(ApiError::Auth(format!("token request refused: {} - {}", status, body)).into());
        }
        let j: serde_json::Value = resp.json().await.map_err(ApiError::from)?;
        Session::from_token_response(&j, previous_refresh)
            .ok_or_else(|| ApiError::Auth("no access_token in tidal token response".into()).into())
    }

    async fn refresh(&self, cur: &Session) -> Result<Session> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| ApiError::Auth("no refresh token".into()))?;
        log::debug!("Refreshing tidal session");
        self.request_token(
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())],
            Some(refresh_token.clone()),
        )
        .await
    }

    async fn client_credentials(&self) -> Result<Session> {
        log::debug!("Requesting tidal client credentials token");
        self.request_token(&[("grant_type", "client_credentials")], None)
            .await
    }

    /// Load the session file into the cache if nothing is cached yet. An
    /// unreadable file is an auth failure, not something to retry.
    fn load_cached(&self, slot: &mut Option<Session>) -> Result<()> {
        if slot.is_none() {
            log::debug!("Loading tidal session from {}", self.session_file.display());
            *slot = session::load(&self.session_file)
                .map_err(|e| ApiError::Auth(format!("{:#}", e)))?;
        }
        Ok(())
    }

    /// New token from the refresh token when there is one, falling back to
    /// the client-credentials grant. Persists and caches the result.
    async fn renew(&self, slot: &mut Option<Session>) -> Result<Session> {
        let mut refresh_err = None;
        if let Some(cur) = slot.clone().filter(|s| s.refresh_token.is_some()) {
            match self.refresh(&cur).await {
                Ok(fresh) => return self.store(slot, fresh),
                Err(e) => {
                    log::warn!("Tidal token refresh failed: {}", e);
                    refresh_err = Some(e);
                }
            }
        }
        if self.has_client_credentials() {
            let fresh = self.client_credentials().await?;
            return self.store(slot, fresh);
        }
        // A refresh that failed for a transient reason may still work later.
        if let Some(e) = refresh_err {
            if api_error(&e).map(|a| a.is_retryable()).unwrap_or(false) {
                return Err(e);
            }
        }
        Err(ApiError::Auth(format!(
            "no usable tidal session at {}; run `beet-tidal auth` or configure client_id/client_secret",
            self.session_file.display()
        ))
        .into())
    }

    fn store(&self, slot: &mut Option<Session>, fresh: Session) -> Result<Session> {
        session::save(&self.session_file, &fresh)?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// Obtain a fresh token regardless of the cached one, persist it and
    /// return it. Used by the `auth-test` helper and after a 401.
    pub async fn force_refresh(&self) -> Result<Session> {
        let mut lock = self.session.lock().await;
        self.load_cached(&mut lock)?;
        self.renew(&mut lock).await
    }

    async fn ensure_session(&self) -> Result<Session> {
        let mut lock = self.session.lock().await;
        self.load_cached(&mut lock)?;
        if let Some(cur) = lock.as_ref() {
            if !cur.expires_within(30) {
                return Ok(cur.clone());
            }
        }
        self.renew(&mut lock).await
    }

    pub async fn get_bearer(&self) -> Result<String> {
        Ok(self.ensure_session().await?.bearer())
    }

    /// GET a catalogue resource. 404 maps to `Ok(None)`. A 401 renews the
    /// token once and re-sends; a second 401 is an auth failure.
    async fn get_json(&self, path_and_query: &str) -> Result<Option<serde_json::Value>> {
        let url = format!("{}{}", self.api_base, path_and_query);
        let mut renewed = false;
        loop {
            let bearer = self.get_bearer().await?;
            let resp = self
                .client
                .get(&url)
                .header(AUTHORIZATION, &bearer)
                .header(ACCEPT, "application/vnd.api+json")
                .send()
                .await
                .map_err(ApiError::from)?;
            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED {
                if renewed {
                    return Err(ApiError::Auth(format!(
                        "GET {} still unauthorized after renewing the token",
                        path_and_query
                    ))
                    .into());
                }
                log::debug!("401 from tidal for {}, renewing token", path_and_query);
                self.force_refresh().await?;
                renewed = true;
                continue;
            }
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(rate_limited(&resp).into());
            }
            if !status.is_success() {
                let txt = resp.text().await.unwrap_or_default();
                log::debug!("tidal GET {} failed: {}", path_and_query, status);
                return Err(ApiError::from_status(status, txt).into());
            }
            return Ok(Some(resp.json().await.map_err(ApiError::from)?));
        }
    }
}

fn rate_limited(resp: &reqwest::Response) -> ApiError {
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    ApiError::RateLimited { retry_after }
}

/// Return the resource object of a response: `data` for JSON:API
/// documents, the document itself for the flat legacy shape.
fn resource(j: &serde_json::Value) -> &serde_json::Value {
    if j["data"].is_object() {
        &j["data"]
    } else {
        j
    }
}

/// Attributes of a resource; legacy objects carry them at the top level.
fn attributes(node: &serde_json::Value) -> &serde_json::Value {
    if node["attributes"].is_object() {
        &node["attributes"]
    } else {
        node
    }
}

fn json_id(v: &serde_json::Value) -> Option<String> {
    v.as_str()
        .map(|s| s.to_string())
        .or_else(|| v.as_i64().map(|i| i.to_string()))
}

/// Convert a catalogue track object into `TrackInfo`.
pub fn parse_track(node: &serde_json::Value) -> Option<TrackInfo> {
    let id = json_id(&node["id"])?;
    let attrs = attributes(node);
    let title = attrs["title"]
        .as_str()
        .unwrap_or_default()
        .replace("&quot;", "\"");
    let length = match &attrs["duration"] {
        serde_json::Value::String(s) => parse_iso_duration(s),
        v => v.as_u64(),
    };
    Some(TrackInfo {
        id,
        title,
        artist: attrs["artist"]["name"].as_str().map(|s| s.to_string()),
        album: attrs["album"]["title"]
            .as_str()
            .map(|s| s.replace("&quot;", "\"")),
        isrc: attrs["isrc"].as_str().map(|s| s.to_string()),
        length,
        popularity: normalize_popularity(&attrs["popularity"]),
        explicit: attrs["explicit"].as_bool(),
    })
}

#[async_trait]
impl Provider for TidalProvider {
    fn name(&self) -> &str {
        "tidal"
    }

    fn is_authenticated(&self) -> bool {
        self.has_client_credentials() || self.session_file.exists()
    }

    async fn authenticate(&self) -> Result<()> {
        self.ensure_session().await.map(|_| ())
    }

    async fn track(&self, track_id: &str) -> Result<Option<TrackInfo>> {
        log::debug!("Looking up tidal track {}", track_id);
        let path = format!(
            "/tracks/{}?countryCode={}",
            urlencoding::encode(track_id),
            self.country_code
        );
        let j = match self.get_json(&path).await? {
            Some(j) => j,
            None => return Ok(None),
        };
        Ok(parse_track(resource(&j)))
    }

    async fn album_popularity(&self, album_id: &str) -> Result<Option<i64>> {
        log::debug!("Looking up tidal album {}", album_id);
        let path = format!(
            "/albums/{}?countryCode={}",
            urlencoding::encode(album_id),
            self.country_code
        );
        let j = match self.get_json(&path).await? {
            Some(j) => j,
            None => return Ok(None),
        };
        Ok(normalize_popularity(&attributes(resource(&j))["popularity"]))
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<TrackInfo>> {
        let path = format!(
            "/search/tracks?query={}&limit=10&countryCode={}",
            urlencoding::encode(query),
            self.country_code
        );
        let j = match self.get_json(&path).await? {
            Some(j) => j,
            None => return Ok(Vec::new()),
        };
        // Search responses either carry `items` directly, wrap them in
        // `items.items`, or use the JSON:API `data` array.
        let items = j["items"]
            .as_array()
            .or_else(|| j["items"]["items"].as_array())
            .or_else(|| j["data"].as_array());
        Ok(items
            .map(|a| a.iter().filter_map(parse_track).collect())
            .unwrap_or_default())
    }
}
