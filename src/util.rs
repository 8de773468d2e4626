use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());
static MEDIUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(CD|disc)\s*\d+").unwrap());
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});

/// Normalize a free-text catalogue query.
///
/// Punctuation such as "!" or "-" makes the search return nothing even when
/// the words match, and medium markers like "CD1" or "disc 2" do the same.
pub fn sanitize_query(query: &str) -> String {
    let q = NON_WORD.replace_all(query, " ");
    let q = MEDIUM.replace_all(&q, "");
    q.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an ISO-8601 duration such as `PT3M20S` into whole seconds.
/// Values too large for a `u64` are rejected.
pub fn parse_iso_duration(s: &str) -> Option<u64> {
    let caps = ISO_DURATION.captures(s.trim())?;
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }
    let part = |i: usize, unit: u64| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u64>().ok()?.checked_mul(unit),
            None => Some(0),
        }
    };
    let secs = match caps.get(4) {
        Some(m) => {
            let f = m.as_str().parse::<f64>().ok()?.round();
            if f >= u64::MAX as f64 {
                return None;
            }
            f as u64
        }
        None => 0,
    };
    part(1, 86_400)?
        .checked_add(part(2, 3_600)?)?
        .checked_add(part(3, 60)?)?
        .checked_add(secs)
}

/// Normalize a popularity value to an integer in 0..=100.
///
/// The v2 catalogue reports a fraction in 0.0..=1.0, the legacy API an integer.
pub fn normalize_popularity(v: &serde_json::Value) -> Option<i64> {
    if let Some(i) = v.as_i64() {
        return Some(i.clamp(0, 100));
    }
    let f = v.as_f64()?;
    let scaled = if f <= 1.0 { f * 100.0 } else { f };
    Some((scaled.round() as i64).clamp(0, 100))
}
