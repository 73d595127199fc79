//! Utility functions for text cleanup, link resolution and file system checks.
//!
//! This module provides helpers used throughout the engine:
//! - Whitespace collapsing and HTML tag stripping for feed/page text
//! - Relative link resolution against a listing or base URL
//! - String truncation for logging
//! - File system validation for output directories

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Remove markup from feed descriptions, which often embed HTML.
pub fn strip_tags(text: &str) -> String {
    collapse_whitespace(&HTML_TAG.replace_all(text, " "))
}

/// Character count, the unit every length threshold in this crate uses.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Resolve an anchor `href` against `base`.
///
/// Handles absolute, protocol-relative (`//host/path`), root-relative and
/// relative links. Anything that does not end up as `http`/`https`
/// (`javascript:`, `mailto:`, fragments of an unparsable base) is rejected.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a scratch file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
