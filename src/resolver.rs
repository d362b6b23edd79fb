//! Resolution: follow client-side redirects to each link's final address.
//!
//! The link list is cut into contiguous batches of `batch_size`. Up to
//! `max_workers` batches run at once; each borrows its own browser session
//! from the [`SessionFactory`] and walks its links one after another.
//!
//! # Ordering
//!
//! Before any batch starts, a result slot is allocated for every input link.
//! Each batch is handed the sub-slice of slots matching its own links, so
//! batches write to disjoint ranges and may finish in any order without a
//! lock. Output position `i` is always the resolution of input position `i`.
//!
//! # Failure
//!
//! A link that fails to load, or settles on its own address, keeps the
//! original URL. A batch whose session cannot be opened keeps all of its
//! original URLs. Neither stops the run.

use crate::browser::{BrowserSession, SessionFactory};
use crate::models::ResolutionRecord;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Worker pool shape for a [`Resolver`]. Zero sizes are clamped to 1.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Batches resolved at once, each in its own browser session.
    pub max_workers: usize,
    /// Contiguous links handled by one session.
    pub batch_size: usize,
    /// Wait after each page load before reading the address.
    pub settle_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            batch_size: 10,
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Batched redirect resolver over a [`SessionFactory`].
pub struct Resolver<S> {
    sessions: S,
    config: ResolverConfig,
}

impl<S: SessionFactory> Resolver<S> {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `sessions` - Opens one browser session per batch
    /// * `config` - Worker count, batch size and settle delay
    pub fn new(sessions: S, config: ResolverConfig) -> Self {
        Self { sessions, config }
    }

    /// Resolve `links`, returning one URL per input in the same order.
    ///
    /// # Returns
    ///
    /// The settled address for each link, or the original where resolution
    /// failed. Never shorter or longer than `links`.
    pub async fn resolve(&self, links: &[String]) -> Vec<String> {
        self.resolve_records(links)
            .await
            .into_iter()
            .map(ResolutionRecord::output)
            .collect()
    }

    /// Resolve `links` into positional [`ResolutionRecord`]s.
    ///
    /// Session and navigation failures are logged, never returned; the
    /// affected records carry `settled: None`.
    #[instrument(level = "info", skip_all, fields(links = links.len()))]
    pub async fn resolve_records(&self, links: &[String]) -> Vec<ResolutionRecord> {
        let batch_size = self.config.batch_size.max(1);
        let max_workers = self.config.max_workers.max(1);
        let batches = links.len().div_ceil(batch_size);
        info!(batches, batch_size, max_workers, "Resolving links");

        let mut settled: Vec<Option<String>> = vec![None; links.len()];

        stream::iter(
            settled
                .chunks_mut(batch_size)
                .zip(links.chunks(batch_size))
                .enumerate(),
        )
        .map(|(batch, (slots, batch_links))| {
            self.resolve_batch(batch * batch_size, batch_links, slots)
        })
        .buffer_unordered(max_workers)
        .collect::<Vec<()>>()
        .await;

        let records = links
            .iter()
            .cloned()
            .zip(settled)
            .map(|(original, settled)| ResolutionRecord { original, settled })
            .collect::<Vec<_>>();

        let redirected = records
            .iter()
            .filter(|r| r.settled.as_ref().is_some_and(|s| s != &r.original))
            .count();
        info!(total = records.len(), redirected, "Resolution complete");
        records
    }

    /// Resolve one batch inside a single session, writing into `slots`.
    #[instrument(level = "info", skip(self, links, slots), fields(len = links.len()))]
    async fn resolve_batch(&self, offset: usize, links: &[String], slots: &mut [Option<String>]) {
        let mut session = match self.sessions.open().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Could not open browser session; batch keeps original links");
                return;
            }
        };

        for (i, (link, slot)) in links.iter().zip(slots.iter_mut()).enumerate() {
            if link.is_empty() {
                continue;
            }
            match session.settled_url(link, self.config.settle_delay).await {
                Ok(url) => {
                    debug!(index = offset + i, %link, settled = %url, "Link settled");
                    *slot = Some(url);
                }
                Err(e) => {
                    warn!(index = offset + i, %link, error = %e, "Resolution failed; keeping original");
                }
            }
        }

        session.close().await;
    }
}
