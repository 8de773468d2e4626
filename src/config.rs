use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::util::expand_home;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Path to the beets library database.
    pub library: PathBuf,
    /// Directory for the daily-rotated log file. No file logging when unset.
    pub log_dir: Option<PathBuf>,
    pub tidal: TidalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TidalConfig {
    /// Total number of attempts per remote lookup before a record is given up on.
    pub attempts: u32,
    /// Random pause between attempts, in seconds: [min, max].
    pub sleep_interval: [u64; 2],
    /// OAuth session file; relative paths live in the app directory.
    pub session_file: PathBuf,
    pub country_code: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub auth_base: String,
}

fn default_api_base() -> String {
    std::env::var("TIDAL_API_BASE").unwrap_or_else(|_| "https://openapi.tidal.com/v2".into())
}

fn default_auth_base() -> String {
    std::env::var("TIDAL_AUTH_BASE").unwrap_or_else(|_| "https://auth.tidal.com".into())
}

/// The beets configuration directory, which also holds our config and session file.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beets")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: app_dir().join("library.db"),
            log_dir: None,
            tidal: TidalConfig::default(),
        }
    }
}

impl Default for TidalConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            sleep_interval: [5, 30],
            session_file: "tidal.json".into(),
            country_code: "US".into(),
            client_id: String::new(),
            client_secret: String::new(),
            api_base: default_api_base(),
            auth_base: default_auth_base(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let mut cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        cfg.library = expand_home(&cfg.library);
        cfg.log_dir = cfg.log_dir.as_deref().map(expand_home);
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.tidal.attempts == 0 {
            anyhow::bail!("tidal.attempts must be at least 1");
        }
        let [min, max] = self.tidal.sleep_interval;
        if min > max {
            anyhow::bail!("tidal.sleep_interval is inverted: [{}, {}]", min, max);
        }
        Ok(())
    }

    /// Session file location with relative paths resolved into the app directory.
    pub fn session_path(&self) -> PathBuf {
        let p = expand_home(&self.tidal.session_file);
        if p.is_absolute() {
            p
        } else {
            app_dir().join(p)
        }
    }
}
