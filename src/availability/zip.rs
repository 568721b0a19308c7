// src/availability/zip.rs
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::core::dedupe_preserving_order;

static ZIP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("valid zip regex"));

/// Every distinct five-digit token in `text`, in order of first appearance.
pub fn extract_zip_codes(text: &str) -> Vec<String> {
    dedupe_preserving_order(ZIP_REGEX.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Zip codes compared as integers. Adjacent numbers are not guaranteed to be
/// adjacent on a map; this is a coarse proximity heuristic only.
pub fn zip_distance(a: &str, b: &str) -> Option<u32> {
    let a: i64 = a.trim().parse().ok()?;
    let b: i64 = b.trim().parse().ok()?;
    u32::try_from((a - b).abs()).ok()
}
