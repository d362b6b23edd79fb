//! JSON report generation.
//!
//! After a full run the headings and summaries artifacts are joined by
//! position into a [`RunReport`]: one entry per extracted article with its
//! title, source URL and summary.

use crate::error::{Result, SentinelError};
use crate::models::{ReportEntry, RunReport};
use crate::outputs::artifacts::{self, parse_headings, parse_summaries};
use chrono::Utc;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Join heading and summary artifacts into report rows.
///
/// Rows are paired by position. If the artifacts disagree in length (a
/// summaries file left over from an earlier run, say) only the common prefix
/// is reported.
pub fn build_report(headings_text: &str, summaries_text: &str, queries: &[String]) -> RunReport {
    let headings = parse_headings(headings_text);
    let summaries = parse_summaries(summaries_text);

    if headings.len() != summaries.len() {
        warn!(
            headings = headings.len(),
            summaries = summaries.len(),
            "Heading and summary counts differ; reporting common prefix"
        );
    }

    let articles = headings
        .into_iter()
        .zip(summaries)
        .enumerate()
        .map(|(i, ((url, title), summary))| ReportEntry {
            ordinal: i + 1,
            title,
            url,
            summary,
        })
        .collect();

    RunReport {
        generated_at: Utc::now(),
        queries: queries.to_vec(),
        articles,
    }
}

/// Build the report from the artifacts on disk and write it to `report_path`.
#[instrument(level = "info", skip_all, fields(report = %report_path.display()))]
pub async fn write_report(
    headings_path: &Path,
    summaries_path: &Path,
    report_path: &Path,
    queries: &[String],
) -> Result<RunReport> {
    let headings = artifacts::read_text(headings_path).await?;
    let summaries = artifacts::read_text(summaries_path).await?;
    let report = build_report(&headings, &summaries, queries);
    save_report(&report, report_path).await?;
    Ok(report)
}

/// Serialize `report` as pretty JSON and write it atomically to `path`.
pub async fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| SentinelError::write(path, e.into()))?;
    artifacts::write_atomic(path, &json).await?;

    info!(articles = report.articles.len(), path = %path.display(), "Wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADINGS: &str = "Link: https://a.example/1\nHeading: Solar\n\nLink: https://b.example/2\nHeading: Wind\n\n";
    const SUMMARIES: &str = "Article 1 Summary:\nSun.\n\nArticle 2 Summary:\nError generating summary.\n\n";

    #[test]
    fn test_build_report_pairs_by_position() {
        let report = build_report(HEADINGS, SUMMARIES, &["energy".to_string()]);
        assert_eq!(report.articles.len(), 2);
        assert_eq!(report.articles[0].title, "Solar");
        assert_eq!(report.articles[0].url, "https://a.example/1");
        assert_eq!(report.articles[0].summary, "Sun.");
        assert_eq!(report.articles[1].ordinal, 2);
        assert_eq!(report.articles[1].summary, "Error generating summary.");
    }

    #[test]
    fn test_build_report_length_mismatch() {
        let report = build_report(HEADINGS, "Article 1 Summary:\nSun.\n\n", &[]);
        assert_eq!(report.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_write_report() {
        let tmp = tempfile::tempdir().unwrap();
        let headings = tmp.path().join("heading.txt");
        let summaries = tmp.path().join("summaries.txt");
        let report_path = tmp.path().join("report.json");
        std::fs::write(&headings, HEADINGS).unwrap();
        std::fs::write(&summaries, SUMMARIES).unwrap();

        let report = write_report(&headings, &summaries, &report_path, &[])
            .await
            .unwrap();
        assert_eq!(report.articles.len(), 2);

        let on_disk: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(on_disk.articles[1].title, "Wind");
    }
}
