//! LLM backend for the summarizer, with exponential backoff.
//!
//! - [`LlmSummarizer`]: sends article text to an OpenAI-compatible API via
//!   `awful_aj`, using a chat template that instructs the model to summarize
//! - [`Retrying`]: decorator that retries any [`Summarize`] implementation
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=250ms)
//! ```
//!
//! With the defaults (5 retries, 1 s base, 30 s cap) a request is attempted
//! six times over roughly half a minute before the summarizer gives up and
//! the article gets the sentinel summary.

use crate::error::SentinelError;
use crate::summarizer::Summarize;
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Backoff schedule for [`Retrying`].
#[derive(Debug, Clone)]
pub struct Backoff {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter_ms: 250,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn delay(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    fn jittered(&self, attempt: usize) -> Duration {
        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rng().random_range(0..=self.max_jitter_ms)
        };
        self.delay(attempt) + Duration::from_millis(jitter)
    }
}

/// Retries the wrapped summarizer according to a [`Backoff`].
pub struct Retrying<S> {
    inner: S,
    backoff: Backoff,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, backoff: Backoff) -> Self {
        Self { inner, backoff }
    }
}

impl<S> fmt::Debug for Retrying<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<S: Summarize> Summarize for Retrying<S> {
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.summarize(text).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.backoff.max_retries {
                        error!(
                            attempt,
                            max = self.backoff.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "summarize() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff.jittered(attempt);
                    warn!(
                        attempt,
                        max = self.backoff.max_retries,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Summarizes through an OpenAI-compatible endpoint configured by `awful_aj`.
pub struct LlmSummarizer {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSummarizer").finish_non_exhaustive()
    }
}

impl LlmSummarizer {
    /// Load the `awful_aj` configuration and the named chat template.
    ///
    /// Without `config_path` the configuration is read from `config.yaml` in
    /// the `awful_aj` config directory.
    pub async fn load(config_path: Option<&Path>, template_name: &str) -> Result<Self, SentinelError> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => config_dir()
                .map_err(|e| SentinelError::Summarizer(e.to_string()))?
                .join("config.yaml"),
        };
        let config_path = config_path.to_str().ok_or_else(|| {
            SentinelError::Summarizer(format!("not a valid config filename: {}", config_path.display()))
        })?;

        let config = config::load_config(config_path)
            .map_err(|e| SentinelError::Summarizer(format!("loading {config_path}: {e}")))?;
        let template = template::load_template(template_name)
            .await
            .map_err(|e| SentinelError::Summarizer(format!("loading template {template_name}: {e}")))?;
        info!(config_path, template = template_name, "Loaded summarizer configuration");

        Ok(Self { config, template })
    }
}

impl Summarize for LlmSummarizer {
    #[instrument(level = "info", skip_all, fields(chars = text.len()))]
    async fn summarize(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "API call failed");
        }
        res
    }
}
