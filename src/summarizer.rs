//! Summarization of extracted articles.
//!
//! The model behind [`Summarize`] is a black box that takes text and returns
//! shorter text. This stage only guarantees alignment: it reads the content
//! artifact, produces exactly one summary per article block, and writes them
//! in block order. Any failure (empty body, backend error, empty reply)
//! becomes [`SUMMARY_UNAVAILABLE`] for that article.

use crate::error::Result;
use crate::models::ContentBlock;
use crate::outputs::artifacts::{self, format_summaries, parse_content};
use crate::utils::{clean_text, truncate_for_log, truncate_tokens};
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Sentinel written when an article could not be summarized.
pub const SUMMARY_UNAVAILABLE: &str = "Error generating summary.";

/// Turns article text into a summary.
pub trait Summarize {
    async fn summarize(&self, text: &str) -> std::result::Result<String, Box<dyn Error>>;
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Whitespace tokens of article text passed to the model; the rest is
    /// dropped.
    pub max_input_tokens: usize,
    /// Articles summarized at once.
    pub concurrency: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            concurrency: 4,
        }
    }
}

pub struct Summarizer<S> {
    backend: S,
    config: SummarizerConfig,
}

impl<S: Summarize> Summarizer<S> {
    pub fn new(backend: S, config: SummarizerConfig) -> Self {
        Self { backend, config }
    }

    /// Summarize one article block. Never fails.
    #[instrument(level = "info", skip_all, fields(ordinal = block.ordinal, source = %block.source))]
    pub async fn summarize_block(&self, block: &ContentBlock) -> String {
        let Some(body) = block.body.as_deref() else {
            warn!("Article has no body text");
            return SUMMARY_UNAVAILABLE.to_string();
        };

        let cleaned = clean_text(body);
        let (input, truncated) = truncate_tokens(&cleaned, self.config.max_input_tokens);
        if truncated {
            debug!(max_tokens = self.config.max_input_tokens, "Article text truncated for summarizer");
        }

        match self.backend.summarize(&input).await {
            Ok(summary) => {
                let summary = clean_text(&summary);
                if summary.is_empty() {
                    warn!("Summarizer returned nothing");
                    SUMMARY_UNAVAILABLE.to_string()
                } else {
                    debug!(summary = %truncate_for_log(&summary, 120), "Summarized article");
                    summary
                }
            }
            Err(e) => {
                warn!(error = %e, "Summarization failed; using sentinel");
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }

    /// Summarize every block, returning summaries in block order.
    pub async fn summarize_all(&self, blocks: &[ContentBlock]) -> Vec<String> {
        stream::iter(blocks)
            .map(|block| self.summarize_block(block))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Read `content_path`, summarize each article, and write `summaries_path`.
    #[instrument(level = "info", skip_all, fields(content = %content_path.display()))]
    pub async fn summarize_files(&self, content_path: &Path, summaries_path: &Path) -> Result<Vec<String>> {
        let content = artifacts::read_text(content_path).await?;
        let blocks = parse_content(&content);
        info!(articles = blocks.len(), "Summarizing articles");

        let summaries = self.summarize_all(&blocks).await;
        artifacts::write_atomic(summaries_path, &format_summaries(&summaries)).await?;

        let failed = summaries.iter().filter(|s| *s == SUMMARY_UNAVAILABLE).count();
        info!(
            total = summaries.len(),
            failed,
            path = %summaries_path.display(),
            "Summaries written"
        );
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::artifacts::parse_summaries;
    use std::cell::RefCell;

    /// Echoes the first three words, fails on text containing "poison".
    #[derive(Default)]
    struct FirstWords {
        seen: RefCell<Vec<String>>,
    }

    impl Summarize for &FirstWords {
        async fn summarize(&self, text: &str) -> std::result::Result<String, Box<dyn Error>> {
            self.seen.borrow_mut().push(text.to_string());
            if text.contains("poison") {
                return Err("model crashed".into());
            }
            if text.contains("silence") {
                return Ok("  \n ".to_string());
            }
            Ok(text.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
        }
    }

    fn block(ordinal: usize, body: Option<&str>) -> ContentBlock {
        ContentBlock {
            ordinal,
            source: format!("https://example.com/{ordinal}"),
            body: body.map(str::to_string),
        }
    }

    fn config(max_input_tokens: usize) -> SummarizerConfig {
        SummarizerConfig {
            max_input_tokens,
            concurrency: 3,
        }
    }

    #[tokio::test]
    async fn test_one_summary_per_block_in_order() {
        let backend = FirstWords::default();
        let summarizer = Summarizer::new(&backend, config(1024));
        let blocks = vec![
            block(1, Some("solar panels are cheap now")),
            block(2, Some("poison pill")),
            block(3, None),
            block(4, Some("silence")),
            block(5, Some("wind\nturbines   spin faster")),
        ];

        let summaries = summarizer.summarize_all(&blocks).await;

        assert_eq!(
            summaries,
            vec![
                "solar panels are".to_string(),
                SUMMARY_UNAVAILABLE.to_string(),
                SUMMARY_UNAVAILABLE.to_string(),
                SUMMARY_UNAVAILABLE.to_string(),
                "wind turbines spin".to_string(),
            ]
        );
        // The bodyless block never reached the backend
        assert_eq!(backend.seen.borrow().len(), 4);
    }

    #[tokio::test]
    async fn test_input_is_cleaned_and_bounded() {
        let backend = FirstWords::default();
        let summarizer = Summarizer::new(&backend, config(4));

        summarizer
            .summarize_block(&block(1, Some("a  b\nc\td e f g")))
            .await;

        assert_eq!(backend.seen.borrow()[0], "a b c d");
    }

    #[tokio::test]
    async fn test_summarize_files() {
        let tmp = tempfile::tempdir().unwrap();
        let content = tmp.path().join("content.txt");
        let summaries_path = tmp.path().join("summaries.txt");
        std::fs::write(
            &content,
            "Source 1: https://a.example/1\nTitle: A\nText: alpha beta gamma delta\n\n\
             Source 2: https://b.example/2\nTitle: B\n\n",
        )
        .unwrap();

        let backend = FirstWords::default();
        let summarizer = Summarizer::new(&backend, config(1024));
        summarizer.summarize_files(&content, &summaries_path).await.unwrap();

        let written = std::fs::read_to_string(&summaries_path).unwrap();
        assert!(written.starts_with("Article 1 Summary:\nalpha beta gamma\n\n"));
        assert_eq!(
            parse_summaries(&written),
            vec!["alpha beta gamma".to_string(), SUMMARY_UNAVAILABLE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_summarize_files_missing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FirstWords::default();
        let summarizer = Summarizer::new(&backend, config(1024));

        let err = summarizer
            .summarize_files(&tmp.path().join("content.txt"), &tmp.path().join("s.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::SentinelError::ArtifactRead { .. }));
    }
}
