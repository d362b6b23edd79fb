//! Discovery: turn search queries into candidate article links.
//!
//! Each query is sent to the search surface once. The results page is handed
//! to a [`LinkExtractor`], truncated to the per-query quota and merged into
//! the run's link set. Queries run one at a time with a pacing delay between
//! them, and stop as soon as the run-wide quota is met.
//!
//! # Ordering
//!
//! Links come out in first-seen order: query order, then document order
//! within a results page. Duplicates keep their first position. The search
//! surface itself reorders results between runs, so this is only stable
//! within one run.
//!
//! # Failure
//!
//! A query whose fetch fails (network error, throttling status, empty page)
//! contributes no links; the remaining queries still run.

use crate::error::{Result, SentinelError};
use crate::fetch::PageFetcher;
use crate::models::SearchParams;
use crate::pacing::{PacingPolicy, pause};
use crate::scrapers::google_news::{LinkExtractor, search_url};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

pub struct Discovery<F, E, P> {
    fetcher: F,
    extractor: E,
    pacing: P,
}

impl<F, E, P> Discovery<F, E, P>
where
    F: PageFetcher,
    E: LinkExtractor,
    P: PacingPolicy,
{
    pub fn new(fetcher: F, extractor: E, pacing: P) -> Self {
        Self {
            fetcher,
            extractor,
            pacing,
        }
    }

    /// Discover at most `params.total_quota` unique links for `queries`.
    ///
    /// Blank queries are ignored. The per-query quota is the total quota
    /// divided by the number of remaining queries, remainder dropped.
    ///
    /// # Errors
    ///
    /// [`SentinelError::Config`] when no non-blank query is given.
    #[instrument(level = "info", skip_all, fields(quota = params.total_quota))]
    pub async fn discover(&self, queries: &[String], params: &SearchParams) -> Result<Vec<String>> {
        let queries = queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>();
        if queries.is_empty() {
            return Err(SentinelError::Config(
                "at least one non-blank search query is required".to_string(),
            ));
        }

        let per_query = params.per_query_quota(queries.len());
        if per_query == 0 {
            warn!(
                queries = queries.len(),
                total_quota = params.total_quota,
                "Quota smaller than query count; every query is capped at zero links, skipping search"
            );
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for (i, term) in queries.iter().enumerate() {
            if links.len() >= params.total_quota {
                info!(collected = links.len(), "Run quota reached; skipping remaining queries");
                break;
            }
            if i > 0 {
                pause(self.pacing.between_queries()).await;
            }

            let found = self.query_links(term, params, per_query).await;
            let before = links.len();
            for link in found {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
            info!(query = %term, new = links.len() - before, total = links.len(), "Query complete");
        }

        links.truncate(params.total_quota);
        info!(count = links.len(), "Discovered candidate links");
        debug!(urls = ?links, "Candidate links");
        Ok(links)
    }

    /// Links for a single query, capped at `quota`, in parse order.
    #[instrument(level = "info", skip(self, params))]
    async fn query_links(&self, term: &str, params: &SearchParams, quota: usize) -> Vec<String> {
        let url = search_url(term, params);
        let body = self.fetcher.get_text(&url).await;
        if body.is_empty() {
            warn!(%url, "Search returned nothing; query contributes no links");
            return Vec::new();
        }

        let mut links = self.extractor.extract_links(&body);
        links.truncate(quota);
        links
    }
}
