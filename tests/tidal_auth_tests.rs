use beets_tidal::api::session;
use beets_tidal::api::tidal_auth::{parse_token_blob, store_token_from};
use beets_tidal::config::Config;
use tempfile::tempdir;

#[test]
fn pasted_token_is_saved_as_session_file() {
    let td = tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.tidal.session_file = td.path().join("tidal.json");

    let input = r#"{"access_token":"abc","refresh_token":"def","token_type":"Bearer","expiry_time":1900000000.0}"#;
    let saved = store_token_from(&cfg, std::io::Cursor::new(format!("{}\n", input))).expect("store token");
    assert_eq!(saved.access_token, "abc");

    let loaded = session::load(&cfg.session_path()).unwrap().expect("session file");
    assert_eq!(loaded, saved);
    assert_eq!(loaded.refresh_token.as_deref(), Some("def"));
    assert_eq!(loaded.expiry_time, 1_900_000_000.0);
}

#[test]
fn expires_in_is_converted_to_expiry_time() {
    let s = parse_token_blob(r#"{"access_token":"abc","expires_in":600}"#).unwrap();
    assert_eq!(s.token_type, "Bearer");
    assert!(s.refresh_token.is_none());
    assert!(!s.expires_within(0));
    assert!(s.expires_within(601));
}

#[test]
fn invalid_blobs_are_rejected() {
    assert!(parse_token_blob("").is_err());
    assert!(parse_token_blob("not json").is_err());
    assert!(parse_token_blob(r#"{"access_token":""}"#).is_err());
}

#[test]
fn missing_session_file_loads_as_none() {
    let td = tempdir().unwrap();
    assert!(session::load(&td.path().join("absent.json")).unwrap().is_none());
}
