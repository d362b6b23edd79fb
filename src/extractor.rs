//! Extraction: fetch each resolved link and pull out its title and text.
//!
//! Links are processed strictly one at a time, with the pacing policy
//! occasionally inserting a long pause, so that traffic looks like a reader
//! working through a list rather than a crawler.
//!
//! For each link:
//!
//! 1. Links without an `http://` or `https://` prefix are skipped (logged,
//!    left in the list).
//! 2. A HEAD probe follows any redirects added since resolution.
//! 3. The page is fetched:
//!    - HTTP 403: the origin is blocking us. The link is dropped from the
//!      list and produces no records.
//!    - Any other failure: logged and counted in the [`FailureLedger`]. The
//!      link stays in the list until it reaches the failure threshold.
//!    - Success: heading and content records are produced under the next
//!      ordinal.
//!
//! Afterwards the link list is rewritten with the surviving links in their
//! original order.

use crate::error::Result;
use crate::fetch::{FetchError, PageFetcher};
use crate::ledger::FailureLedger;
use crate::models::ExtractedArticle;
use crate::outputs::artifacts::{self, format_content, format_headings};
use crate::pacing::{PacingPolicy, pause};
use crate::scrapers::article::{ParsedArticle, parse_article};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// Tuning for an [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Consecutive failures after which a link is dropped. `0` keeps failing
    /// links forever.
    pub max_consecutive_failures: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
        }
    }
}

/// Files read and written by an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionPaths {
    /// Link list; read, then rewritten with the survivors.
    pub urls: PathBuf,
    /// Receives `Article N:` / `Title:` / `URL:` blocks.
    pub headings: PathBuf,
    /// Receives `Article N:` / `Text:` blocks, numbered like the headings.
    pub content: PathBuf,
}

/// What happened to a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Extracted(ParsedArticle),
    /// The origin answered 403.
    Blocked,
    /// Any other error, with its message.
    Failed(String),
    /// Not an `http(s)` link.
    Skipped,
}

/// Result of extracting a whole link list.
#[derive(Debug, Default)]
pub struct Extraction {
    pub articles: Vec<ExtractedArticle>,
    /// Input links minus blocked and retired ones, in input order.
    pub surviving: Vec<String>,
    /// Links the origin refused, in input order.
    pub blocked: Vec<String>,
    /// Links dropped for reaching the failure threshold.
    pub retired: Vec<String>,
    /// Failed fetches this run, one per occurrence.
    pub failed: usize,
    pub skipped: usize,
}

/// Sequential page extractor over a [`PageFetcher`].
pub struct Extractor<F, P> {
    fetcher: F,
    pacing: P,
    config: ExtractorConfig,
}

impl<F: PageFetcher, P: PacingPolicy> Extractor<F, P> {
    /// Create an extractor.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Page access for the HEAD probe and the GET
    /// * `pacing` - Decides when to pause between links
    /// * `config` - Failure threshold for retiring links
    pub fn new(fetcher: F, pacing: P, config: ExtractorConfig) -> Self {
        Self {
            fetcher,
            pacing,
            config,
        }
    }

    /// Extract every link in `urls`, updating `ledger` as links fail or
    /// recover.
    ///
    /// # Arguments
    ///
    /// * `urls` - The link list, one entry per line of the links artifact
    /// * `ledger` - Failure counts carried over from earlier runs
    ///
    /// # Returns
    ///
    /// The extracted articles in list order, plus the surviving list.
    ///
    /// A URL that appears more than once is counted in the ledger at most
    /// once per call, and every occurrence of a retired URL is removed.
    /// If any occurrence succeeds the URL counts as a success.
    #[instrument(level = "info", skip_all, fields(links = urls.len()))]
    pub async fn extract(&self, urls: &[String], ledger: &mut FailureLedger) -> Extraction {
        let mut result = Extraction::default();
        let mut removed = vec![false; urls.len()];
        let mut succeeded: HashSet<&str> = HashSet::new();
        let mut failing: Vec<&str> = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            let outcome = if is_fetchable(url) {
                if let Some(delay) = self.pacing.before_extraction() {
                    pause(delay).await;
                }
                self.extract_one(url).await
            } else {
                Outcome::Skipped
            };

            match outcome {
                Outcome::Extracted(parsed) => {
                    succeeded.insert(url.as_str());
                    let ordinal = result.articles.len() + 1;
                    info!(ordinal, %url, title = %parsed.title, paragraphs = parsed.paragraphs.len(), "Extracted article");
                    result.articles.push(ExtractedArticle {
                        ordinal,
                        source_url: url.clone(),
                        title: parsed.title,
                        paragraphs: parsed.paragraphs,
                    });
                }
                Outcome::Blocked => {
                    warn!(%url, "403 Forbidden; dropping link");
                    removed[i] = true;
                    result.blocked.push(url.clone());
                }
                Outcome::Failed(reason) => {
                    result.failed += 1;
                    error!(%url, error = %reason, "Extraction failed");
                    if !failing.contains(&url.as_str()) {
                        failing.push(url.as_str());
                    }
                }
                Outcome::Skipped => {
                    if !url.is_empty() {
                        warn!(%url, "Invalid URL; skipping");
                    }
                    result.skipped += 1;
                }
            }
        }

        for url in &succeeded {
            let prior = ledger.failures(url);
            if prior > 0 {
                info!(%url, prior, "Link recovered after earlier failures");
            }
            ledger.record_success(url);
        }

        let limit = self.config.max_consecutive_failures;
        let mut retired: HashSet<&str> = HashSet::new();
        for url in failing.into_iter().filter(|u| !succeeded.contains(u)) {
            let count = ledger.record_failure(url);
            if limit > 0 && count >= limit {
                warn!(%url, count, "Extraction failed too many times; dropping link");
                retired.insert(url);
                result.retired.push(url.to_string());
            } else {
                info!(%url, count, limit, "Keeping failed link for retry");
            }
        }
        for (url, removed) in urls.iter().zip(removed.iter_mut()) {
            if retired.contains(url.as_str()) {
                *removed = true;
            }
        }

        result.surviving = urls
            .iter()
            .zip(&removed)
            .filter(|(_, removed)| !**removed)
            .map(|(url, _)| url.clone())
            .collect();
        ledger.retain_only(&result.surviving);

        info!(
            extracted = result.articles.len(),
            blocked = result.blocked.len(),
            retired = result.retired.len(),
            failed = result.failed,
            skipped = result.skipped,
            surviving = result.surviving.len(),
            "Extraction complete"
        );
        result
    }

    /// Probe, fetch and parse one link.
    #[instrument(level = "info", skip(self))]
    async fn extract_one(&self, url: &str) -> Outcome {
        let target = match self.fetcher.probe(url).await {
            Ok(target) => target,
            Err(e) => {
                debug!(error = %e, "HEAD probe failed; fetching unprobed URL");
                url.to_string()
            }
        };
        if target != url {
            debug!(%target, "Probe redirected");
        }

        let page = match self.fetcher.get(&target).await {
            Ok(page) => page,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        if page.status == 403 {
            return Outcome::Blocked;
        }
        if !page.is_success() {
            return Outcome::Failed(
                FetchError::Status {
                    url: target,
                    status: page.status,
                }
                .to_string(),
            );
        }

        Outcome::Extracted(parse_article(&page.body))
    }

    /// Run extraction against artifact files.
    ///
    /// Reads the link list, writes the heading and content artifacts, then
    /// rewrites the link list and its failure ledger. Every write replaces
    /// its file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the link list or ledger cannot be read, or if any
    /// artifact cannot be written. Per-link failures are never errors.
    #[instrument(level = "info", skip_all, fields(urls = %paths.urls.display()))]
    pub async fn extract_files(&self, paths: &ExtractionPaths) -> Result<Extraction> {
        let urls = artifacts::read_lines(&paths.urls).await?;
        let ledger_path = FailureLedger::path_for(&paths.urls);
        let mut ledger = FailureLedger::load(&ledger_path).await?;

        let extraction = self.extract(&urls, &mut ledger).await;

        artifacts::write_atomic(&paths.headings, &format_headings(&extraction.articles)).await?;
        artifacts::write_atomic(&paths.content, &format_content(&extraction.articles)).await?;
        if extraction.surviving != urls {
            artifacts::write_lines(&paths.urls, &extraction.surviving).await?;
            info!(
                before = urls.len(),
                after = extraction.surviving.len(),
                "Rewrote link list"
            );
        }
        if !ledger.is_empty() || ledger_path.exists() {
            ledger.save(&ledger_path).await?;
        }

        Ok(extraction)
    }
}

fn is_fetchable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
