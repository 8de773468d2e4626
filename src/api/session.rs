use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// OAuth session persisted between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch seconds.
    pub expiry_time: f64,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl Session {
    /// Build a session from a token endpoint response body.
    pub fn from_token_response(j: &serde_json::Value, previous_refresh: Option<String>) -> Option<Self> {
        let access_token = j["access_token"].as_str()?.to_string();
        let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
        Some(Self {
            token_type: j["token_type"].as_str().unwrap_or("Bearer").to_string(),
            access_token,
            refresh_token: j["refresh_token"]
                .as_str()
                .map(|s| s.to_string())
                .or(previous_refresh),
            expiry_time: (Utc::now().timestamp() + expires_in) as f64,
        })
    }

    /// True when the token expires within `margin_secs`.
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        (Utc::now().timestamp() + margin_secs) as f64 >= self.expiry_time
    }

    pub fn bearer(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Load a session file. A missing file yields `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<Session>> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading tidal session {}", path.display())),
    };
    let session: Session = serde_json::from_str(&s)
        .with_context(|| format!("parsing tidal session {}", path.display()))?;
    Ok(Some(session))
}

pub fn save(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let s = serde_json::to_string_pretty(session)?;
    std::fs::write(path, s).with_context(|| format!("writing tidal session {}", path.display()))?;
    Ok(())
}
