//! HTTP fetch client with rotating identity and bounded concurrency.
//!
//! Discovery and extraction both talk to pages through the [`PageFetcher`]
//! trait so that tests can swap the network for canned responses. The real
//! implementation, [`FetchClient`], wraps a `reqwest::Client` that:
//!
//! - picks a `User-Agent` per request from an [`IdentityChooser`]
//! - caps in-flight requests with a semaphore
//! - applies a per-request timeout so a stalled origin cannot hang the run

use rand::{rng, seq::IndexedRandom};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

/// Browser identities rotated across requests.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/64.0.3282.140 Safari/537.36 Edge/17.17134",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/44.0.2403.157 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:79.0) Gecko/20100101 Firefox/79.0",
];

/// Chooses the `User-Agent` sent with each request.
pub trait IdentityChooser {
    fn user_agent(&self) -> &str;
}

/// Picks uniformly at random from a fixed list of identities.
#[derive(Debug, Clone)]
pub struct RotatingIdentity {
    agents: Vec<String>,
}

impl RotatingIdentity {
    /// Rotate over exactly `agents`. An empty list falls back to the first
    /// built-in identity on every request.
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }

    /// The given identities, or the built-in list when none are given.
    pub fn or_default(agents: Vec<String>) -> Self {
        if agents.is_empty() {
            Self::default()
        } else {
            Self::new(agents)
        }
    }
}

impl Default for RotatingIdentity {
    fn default() -> Self {
        Self::new(USER_AGENTS.iter().map(|s| s.to_string()).collect())
    }
}

impl IdentityChooser for RotatingIdentity {
    fn user_agent(&self) -> &str {
        self.agents
            .choose(&mut rng())
            .map(String::as_str)
            .unwrap_or(USER_AGENTS[0])
    }
}

/// A fetched page with the address it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    /// Final URL after HTTP redirects.
    pub url: String,
    pub body: String,
}

impl FetchedPage {
    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Single-request page access used by discovery and extraction.
pub trait PageFetcher {
    /// GET a page following HTTP redirects.
    ///
    /// # Returns
    ///
    /// The page with its status, final URL and body. Non-success statuses
    /// are returned as pages, not errors.
    ///
    /// # Errors
    ///
    /// [`FetchError::Network`] on connection failures and timeouts.
    async fn get(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// HEAD the URL following redirects and return where it landed.
    ///
    /// The status is not checked; the GET that follows decides the outcome.
    ///
    /// # Errors
    ///
    /// [`FetchError::Network`] when the request cannot be completed.
    async fn probe(&self, url: &str) -> Result<String, FetchError>;

    /// GET a page and return its body, or an empty string on any failure.
    async fn get_text(&self, url: &str) -> String {
        match self.get(url).await {
            Ok(page) if page.is_success() => page.body,
            Ok(page) => {
                warn!(%url, status = page.status, "Request rejected");
                String::new()
            }
            Err(e) => {
                warn!(%url, error = %e, "Request failed");
                String::new()
            }
        }
    }
}

/// `reqwest`-backed [`PageFetcher`].
pub struct FetchClient<I> {
    /// Shared connection pool with the timeout and redirect policy baked in.
    client: reqwest::Client,
    /// Source of the `User-Agent` header, consulted once per request.
    identity: I,
    /// One permit per request allowed in flight.
    permits: Semaphore,
}

impl<I: IdentityChooser> FetchClient<I> {
    /// Build a client that allows at most `max_in_flight` concurrent requests,
    /// each bounded by `timeout`.
    ///
    /// # Arguments
    ///
    /// * `identity` - Chooses the `User-Agent` for every request
    /// * `timeout` - Whole-request deadline, body included
    /// * `max_in_flight` - Concurrent request cap; `0` is treated as `1`
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the TLS backend cannot be initialised.
    pub fn new(identity: I, timeout: Duration, max_in_flight: usize) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            identity,
            permits: Semaphore::new(max_in_flight.max(1)),
        })
    }
}

impl<I: IdentityChooser> PageFetcher for FetchClient<I> {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let resp = self
            .client
            .get(url)
            .header(header::USER_AGENT, self.identity.user_agent())
            .send()
            .await?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await?;
        debug!(status, bytes = body.len(), %final_url, "Fetched page");

        Ok(FetchedPage {
            status,
            url: final_url,
            body,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let resp = self
            .client
            .head(url)
            .header(header::USER_AGENT, self.identity.user_agent())
            .send()
            .await?;

        Ok(resp.url().to_string())
    }
}
