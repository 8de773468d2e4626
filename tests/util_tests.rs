use beets_tidal::util::{normalize_popularity, parse_iso_duration, sanitize_query};
use serde_json::json;

#[test]
fn sanitize_query_strips_punctuation_and_medium_markers() {
    assert_eq!(sanitize_query("AC/DC - Back in Black!"), "AC DC Back in Black");
    assert_eq!(sanitize_query("Mellon Collie (Disc 2)"), "Mellon Collie");
    assert_eq!(sanitize_query("The Wall CD1"), "The Wall");
    assert_eq!(sanitize_query("Sigur Rós – Ágætis byrjun"), "Sigur Rós Ágætis byrjun");
}

#[test]
fn iso_durations() {
    assert_eq!(parse_iso_duration("PT3M20S"), Some(200));
    assert_eq!(parse_iso_duration("PT1H2M3S"), Some(3723));
    assert_eq!(parse_iso_duration("PT45.6S"), Some(46));
    assert_eq!(parse_iso_duration("PT"), None);
    assert_eq!(parse_iso_duration("3:20"), None);
}

#[test]
fn oversized_iso_durations_are_rejected() {
    // 213503982334602 days is just past u64::MAX seconds.
    assert_eq!(parse_iso_duration("P213503982334602D"), None);
    assert_eq!(parse_iso_duration("PT99999999999999999999H"), None);
    assert_eq!(parse_iso_duration("P1DT18446744073709551615S"), None);
    assert_eq!(parse_iso_duration("P2D"), Some(172_800));
}

#[test]
fn popularity_normalization() {
    assert_eq!(normalize_popularity(&json!(37)), Some(37));
    assert_eq!(normalize_popularity(&json!(0.534)), Some(53));
    assert_eq!(normalize_popularity(&json!(1.0)), Some(100));
    assert_eq!(normalize_popularity(&json!(250)), Some(100));
    assert_eq!(normalize_popularity(&json!(null)), None);
    assert_eq!(normalize_popularity(&json!("high")), None);
}
