//! Endpoint classification for rate limiting.
//!
//! Maps a request path onto the tier whose budget it is charged against.
//! Rules are ordered substring matches; the first hit wins.

use crate::models::Tier;

const OCR_MARKERS: &[&str] = &["/extract-meter-reading"];
const UPLOAD_MARKERS: &[&str] = &["/upload"];
const AUTH_MARKERS: &[&str] = &["/login", "/signup", "/refresh"];
const EXPORT_MARKERS: &[&str] = &["/export"];

const RULES: &[(&[&str], Tier)] = &[
    (OCR_MARKERS, Tier::Ocr),
    (UPLOAD_MARKERS, Tier::Upload),
    (AUTH_MARKERS, Tier::Auth),
    (EXPORT_MARKERS, Tier::Export),
];

/// Determine the tier for a request path. Never fails.
pub fn classify(path: &str) -> Tier {
    RULES
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| path.contains(m)))
        .map(|(_, tier)| *tier)
        .unwrap_or(Tier::Default)
}
