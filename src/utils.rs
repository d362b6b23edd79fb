//! Text and file system helpers.
//!
//! - Whitespace normalization for article text
//! - Input bounding for the summarizer
//! - String truncation for logging
//! - Output directory validation

use crate::error::{Result, SentinelError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Collapse every run of whitespace (including newlines) into one space and
/// trim the ends.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Keep at most `max_tokens` whitespace-separated tokens of `text`.
///
/// Returns the (possibly shortened) text and whether anything was cut.
pub fn truncate_tokens(text: &str, max_tokens: usize) -> (String, bool) {
    let mut tokens = text.split_whitespace();
    let kept = tokens.by_ref().take(max_tokens).collect::<Vec<_>>().join(" ");
    let truncated = tokens.next().is_some();
    (kept, truncated)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a char boundary) with
/// an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file so
/// that a read-only output location fails before any network work is done.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| SentinelError::write(path, e))?;

    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(SentinelError::write(path, e)),
    }
}
