use super::session::{self, Session};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::io::BufRead;
use tracing::info;

/// Token JSON as pasted by the user. Accepts either an absolute
/// `expiry_time` or a relative `expires_in`.
#[derive(Deserialize)]
struct TokenBlob {
    access_token: String,
    token_type: Option<String>,
    refresh_token: Option<String>,
    expiry_time: Option<f64>,
    expires_in: Option<i64>,
}

/// Parse a pasted token blob into a session.
pub fn parse_token_blob(s: &str) -> Result<Session> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow!("no input provided"));
    }
    let tb: TokenBlob = serde_json::from_str(s).context("token JSON is not valid")?;
    if tb.access_token.trim().is_empty() {
        return Err(anyhow!("access_token is empty"));
    }
    let expiry_time = match (tb.expiry_time, tb.expires_in) {
        (Some(t), _) => t,
        (None, Some(secs)) => (Utc::now().timestamp() + secs) as f64,
        (None, None) => (Utc::now().timestamp() + 3600) as f64,
    };
    Ok(Session {
        token_type: tb.token_type.unwrap_or_else(|| "Bearer".into()),
        access_token: tb.access_token,
        refresh_token: tb.refresh_token.filter(|r| !r.is_empty()),
        expiry_time,
    })
}

/// Read a token blob from `input` and store it as the session file.
pub fn store_token_from<R: BufRead>(cfg: &Config, mut input: R) -> Result<Session> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let session = parse_token_blob(&line)?;
    let path = cfg.session_path();
    session::save(&path, &session)?;
    info!("Tidal session saved to {}", path.display());
    Ok(session)
}

pub fn run_tidal_auth(cfg: &Config) -> Result<()> {
    println!("Paste Tidal token JSON (single line) and press Enter:");
    let stdin = std::io::stdin();
    store_token_from(cfg, stdin.lock())?;
    println!("Saved tidal session to {}.", cfg.session_path().display());
    Ok(())
}
