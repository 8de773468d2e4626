use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use beets_tidal::config::{app_dir, Config};
use beets_tidal::retry::RetryPolicy;
use std::time::Duration;

#[test]
fn config_from_path_parses_toml() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    let toml = r#"
library = "/tmp/music/library.db"
log_dir = "/tmp/logs"

[tidal]
attempts = 3
sleep_interval = [1, 2]
session_file = "/tmp/tidal-session.json"
country_code = "NO"
"#;
    f.write_all(toml.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.library.to_str().unwrap(), "/tmp/music/library.db");
    assert_eq!(cfg.log_dir.as_deref().and_then(|p| p.to_str()), Some("/tmp/logs"));
    assert_eq!(cfg.tidal.attempts, 3);
    assert_eq!(cfg.tidal.sleep_interval, [1, 2]);
    assert_eq!(cfg.tidal.country_code, "NO");
    assert_eq!(cfg.session_path().to_str().unwrap(), "/tmp/tidal-session.json");
}

#[test]
fn empty_config_uses_plugin_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    File::create(&cfg_path).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse empty config");
    assert_eq!(cfg.tidal.attempts, 5);
    assert_eq!(cfg.tidal.sleep_interval, [5, 30]);
    assert!(cfg.log_dir.is_none());
    assert_eq!(cfg.session_path(), app_dir().join("tidal.json"));
    assert_eq!(cfg.library, app_dir().join("library.db"));
}

#[test]
fn invalid_retry_settings_are_rejected() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    std::fs::write(&cfg_path, "[tidal]\nattempts = 0\n").unwrap();
    assert!(Config::from_path(&cfg_path).is_err());

    std::fs::write(&cfg_path, "[tidal]\nsleep_interval = [30, 5]\n").unwrap();
    assert!(Config::from_path(&cfg_path).is_err());
}

#[test]
fn retry_policy_follows_config() {
    let cfg = Config::default();
    let policy = RetryPolicy::from_config(&cfg.tidal);
    assert_eq!(policy.attempts, 5);
    assert_eq!(policy.min_sleep, Duration::from_secs(5));
    assert_eq!(policy.max_sleep, Duration::from_secs(30));
}
