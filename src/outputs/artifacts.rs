//! Run artifacts: the ordered text files passed between stages.
//!
//! # Formats
//!
//! ```text
//! links_temp.txt / links.txt     one URL per line
//!
//! heading.txt                    Link: https://example.com/a
//!                                Heading: Example headline
//!                                <blank>
//!
//! content.txt                    Source 1: https://example.com/a
//!                                Title: Example headline
//!                                Text: first paragraph
//!                                Text: second paragraph
//!                                <blank>
//!
//! summaries.txt                  Article 1 Summary:
//!                                condensed text
//!                                <blank>
//! ```
//!
//! Every write goes to a temporary sibling file that is then renamed over
//! the destination, so a reader never observes a half-written artifact.

use crate::error::{Result, SentinelError};
use crate::models::{ContentBlock, ExtractedArticle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

static SOURCE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Source (\d+): (.*)$").expect("static regex"));
static SUMMARY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Article (\d+) Summary:$").expect("static regex"));

/// Read a one-item-per-line artifact. Lines are trimmed; blank lines are
/// kept so that positions line up with the file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = read_text(path).await?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

pub async fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| SentinelError::read(path, e))
}

/// Write one item per line.
pub async fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    write_atomic(path, &out).await
}

/// Replace `path` with `contents` via a temporary sibling and a rename.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), bytes = contents.len()))]
pub async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SentinelError::write(path, e))?;
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, contents)
        .await
        .map_err(|e| SentinelError::write(path, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(SentinelError::write(path, e));
    }
    debug!("Artifact written");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

pub fn format_headings(articles: &[ExtractedArticle]) -> String {
    let mut out = String::new();
    for article in articles {
        let _ = write!(
            out,
            "Link: {}\nHeading: {}\n\n",
            article.source_url, article.title
        );
    }
    out
}

/// Parse the headings artifact into `(url, title)` pairs.
pub fn parse_headings(text: &str) -> Vec<(String, String)> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut url = None;
            let mut title = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("Link: ") {
                    url = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("Heading: ") {
                    title = Some(rest.trim().to_string());
                }
            }
            Some((url?, title?))
        })
        .collect()
}

pub fn format_content(articles: &[ExtractedArticle]) -> String {
    let mut out = String::new();
    for article in articles {
        let _ = writeln!(out, "Source {}: {}", article.ordinal, article.source_url);
        let _ = writeln!(out, "Title: {}", article.title);
        for paragraph in &article.paragraphs {
            let _ = writeln!(out, "Text: {paragraph}");
        }
        out.push('\n');
    }
    out
}

/// Parse the content artifact back into per-article blocks.
///
/// Blocks start at `Source <n>: <url>` lines. A block with no `Text:` lines
/// is still returned, with `body: None`, so callers keep one slot per
/// article.
pub fn parse_content(text: &str) -> Vec<ContentBlock> {
    let mut blocks: Vec<ContentBlock> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = SOURCE_HEADER.captures(line) {
            finish_block(&mut blocks, &mut body);
            blocks.push(ContentBlock {
                ordinal: caps[1].parse().unwrap_or(blocks.len() + 1),
                source: caps[2].trim().to_string(),
                body: None,
            });
        } else if let Some(rest) = line.strip_prefix("Text: ") {
            if !blocks.is_empty() {
                body.push(rest);
            }
        }
    }
    finish_block(&mut blocks, &mut body);
    blocks
}

/// Attach the collected `Text:` lines to the last block.
fn finish_block(blocks: &mut [ContentBlock], body: &mut Vec<&str>) {
    if let Some(last) = blocks.last_mut() {
        last.body = (!body.is_empty()).then(|| body.join("\n"));
    }
    body.clear();
}

pub fn format_summaries(summaries: &[String]) -> String {
    let mut out = String::new();
    for (i, summary) in summaries.iter().enumerate() {
        let _ = write!(out, "Article {} Summary:\n{}\n\n", i + 1, summary);
    }
    out
}

/// Parse the summaries artifact into summary texts in article order.
pub fn parse_summaries(text: &str) -> Vec<String> {
    let mut summaries: Vec<String> = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        if SUMMARY_HEADER.is_match(line) {
            if let Some(lines) = current.take() {
                summaries.push(lines.join("\n").trim().to_string());
            }
            current = Some(Vec::new());
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some(lines) = current {
        summaries.push(lines.join("\n").trim().to_string());
    }
    summaries
}
