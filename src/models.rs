//! Data models shared by the pipeline stages.
//!
//! This module defines the values that flow between stages:
//! - [`Recency`] and [`SearchParams`]: the run-wide discovery settings
//! - [`ResolutionRecord`]: a link paired with where it settled
//! - [`ExtractedArticle`]: an article that survived extraction
//! - [`ContentBlock`]: one article read back from the content artifact
//! - [`RunReport`]: the JSON document written after a full run

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Placeholder heading used when a page has no `<title>`.
pub const NO_TITLE: &str = "No title found";

/// How far back the search surface should look.
///
/// The CLI and YAML spellings (`1d`, `7d`, ...) are the qualifier values the
/// search surface understands after `when:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Recency {
    #[serde(rename = "1d")]
    #[value(name = "1d")]
    LastDay,
    #[serde(rename = "7d")]
    #[value(name = "7d")]
    LastWeek,
    #[serde(rename = "1m")]
    #[value(name = "1m")]
    LastMonth,
    #[serde(rename = "3m")]
    #[value(name = "3m")]
    Last3Months,
    #[serde(rename = "1y")]
    #[value(name = "1y")]
    LastYear,
    #[default]
    #[serde(rename = "anytime")]
    #[value(name = "anytime")]
    Anytime,
}

impl Recency {
    /// The `when:` qualifier value, or `None` for [`Recency::Anytime`].
    pub fn qualifier(self) -> Option<&'static str> {
        match self {
            Recency::LastDay => Some("1d"),
            Recency::LastWeek => Some("7d"),
            Recency::LastMonth => Some("1m"),
            Recency::Last3Months => Some("3m"),
            Recency::LastYear => Some("1y"),
            Recency::Anytime => None,
        }
    }
}

/// Settings shared by every query of a discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Country code for the search surface (`gl`), e.g. `US`.
    pub locale: String,
    /// Interface language (`hl`), e.g. `en`.
    pub language: String,
    pub recency: Recency,
    /// Upper bound on links for the whole run.
    pub total_quota: usize,
}

impl SearchParams {
    /// Links allowed per query: total quota divided by query count, remainder
    /// dropped. Zero queries yield zero.
    pub fn per_query_quota(&self, query_count: usize) -> usize {
        if query_count == 0 {
            0
        } else {
            self.total_quota / query_count
        }
    }
}

/// Outcome of resolving one link, paired with the link itself.
///
/// `settled` is `None` when the browser could not load the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub original: String,
    pub settled: Option<String>,
}

impl ResolutionRecord {
    /// The link to carry forward: the settled address if it exists and
    /// differs from the original, otherwise the original.
    pub fn output(self) -> String {
        match self.settled {
            Some(settled) if !settled.is_empty() && settled != self.original => settled,
            _ => self.original,
        }
    }
}

/// An article that was fetched and parsed successfully.
///
/// `ordinal` is assigned in extraction order starting at 1 and is shared by
/// the heading and content records written for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub ordinal: usize,
    /// The URL as it appeared in the link list (before the HEAD probe).
    pub source_url: String,
    pub title: String,
    pub paragraphs: Vec<String>,
}

/// One article block parsed back out of the content artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub ordinal: usize,
    pub source: String,
    /// Paragraph text joined with newlines; `None` when the block had no
    /// `Text:` lines at all.
    pub body: Option<String>,
}

/// A single row of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub ordinal: usize,
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// JSON document written at the end of `run`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub queries: Vec<String>,
    pub articles: Vec<ReportEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_qualifier() {
        assert_eq!(Recency::LastDay.qualifier(), Some("1d"));
        assert_eq!(Recency::Last3Months.qualifier(), Some("3m"));
        assert_eq!(Recency::Anytime.qualifier(), None);
    }

    #[test]
    fn test_recency_yaml_spelling() {
        let r: Recency = serde_yaml::from_str("7d").unwrap();
        assert_eq!(r, Recency::LastWeek);
        let r: Recency = serde_yaml::from_str("anytime").unwrap();
        assert_eq!(r, Recency::Anytime);
        assert!(serde_yaml::from_str::<Recency>("2w").is_err());
    }

    #[test]
    fn test_per_query_quota_drops_remainder() {
        let params = SearchParams {
            locale: "US".to_string(),
            language: "en".to_string(),
            recency: Recency::Anytime,
            total_quota: 10,
        };
        assert_eq!(params.per_query_quota(1), 10);
        assert_eq!(params.per_query_quota(3), 3);
        assert_eq!(params.per_query_quota(11), 0);
        assert_eq!(params.per_query_quota(0), 0);
    }

    #[test]
    fn test_resolution_record_output() {
        let record = |settled: Option<&str>| ResolutionRecord {
            original: "https://news.google.com/read/a".to_string(),
            settled: settled.map(str::to_string),
        };
        assert_eq!(
            record(Some("https://publisher.example/story")).output(),
            "https://publisher.example/story"
        );
        assert_eq!(record(None).output(), "https://news.google.com/read/a");
        assert_eq!(
            record(Some("https://news.google.com/read/a")).output(),
            "https://news.google.com/read/a"
        );
        assert_eq!(record(Some("")).output(), "https://news.google.com/read/a");
    }

    #[test]
    fn test_run_report_serialization() {
        let report = RunReport {
            generated_at: Utc::now(),
            queries: vec!["renewable energy".to_string()],
            articles: vec![ReportEntry {
                ordinal: 1,
                title: "Solar output hits record".to_string(),
                url: "https://example.com/solar".to_string(),
                summary: "Solar did well.".to_string(),
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("renewable energy"));
        assert!(json.contains("\"ordinal\":1"));

        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.articles[0].title, "Solar output hits record");
    }
}
