//! Scripted browser sessions for redirect resolution.
//!
//! Some redirects (Google News `read/` links among them) only complete after
//! client-side script runs, so resolution needs a real browser. A
//! [`SessionFactory`] lends one [`BrowserSession`] to a batch of links; the
//! batch closes it when done. Sessions are never shared, so cookies and other
//! browser state from one batch cannot leak into another.
//!
//! [`ChromeSessions`] launches a separate headless Chromium per session, each
//! with its own throwaway profile directory.

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page load timed out after {0:?}")]
    Timeout(Duration),

    #[error("page reported no address")]
    NoAddress,
}

/// A browser session owned by one worker for one batch.
pub trait BrowserSession {
    /// Load `url`, wait `settle` for client-side redirects, and return the
    /// address the page ended up on.
    async fn settled_url(&mut self, url: &str, settle: Duration) -> Result<String, BrowserError>;

    /// Release the session and everything it holds.
    async fn close(self);
}

/// Opens isolated browser sessions.
pub trait SessionFactory {
    type Session: BrowserSession;

    async fn open(&self) -> Result<Self::Session, BrowserError>;
}

/// Launch settings for [`ChromeSessions`].
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    /// Bound on a single page load.
    pub load_timeout: Duration,
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    /// Pass `--no-sandbox`, needed when running as root in containers.
    pub no_sandbox: bool,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            load_timeout: Duration::from_secs(30),
            executable: None,
            no_sandbox: false,
        }
    }
}

/// Chromium-backed [`SessionFactory`].
#[derive(Debug)]
pub struct ChromeSessions {
    options: ChromeOptions,
    launched: AtomicUsize,
}

impl ChromeSessions {
    pub fn new(options: ChromeOptions) -> Self {
        Self {
            options,
            launched: AtomicUsize::new(0),
        }
    }

    fn profile_dir(&self) -> PathBuf {
        let n = self.launched.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("news-sentinel-{}-{n}", std::process::id()))
    }
}

impl SessionFactory for ChromeSessions {
    type Session = ChromeSession;

    #[instrument(level = "debug", skip_all)]
    async fn open(&self) -> Result<ChromeSession, BrowserError> {
        let profile = self.profile_dir();

        let mut builder = BrowserConfig::builder()
            .arg("--disable-notifications")
            .user_data_dir(&profile)
            .request_timeout(self.options.load_timeout);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if self.options.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromeSession {
            browser,
            page: None,
            handler,
            profile,
            load_timeout: self.options.load_timeout,
        };

        let blank = session.browser.new_page("about:blank").await;
        match blank {
            Ok(page) => {
                session.page = Some(page);
                debug!(profile = %session.profile.display(), "Browser session opened");
                Ok(session)
            }
            Err(e) => {
                session.close().await;
                Err(BrowserError::Launch(e.to_string()))
            }
        }
    }
}

/// One Chromium process, one tab, one profile directory.
pub struct ChromeSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    profile: PathBuf,
    load_timeout: Duration,
}

impl BrowserSession for ChromeSession {
    async fn settled_url(&mut self, url: &str, settle: Duration) -> Result<String, BrowserError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BrowserError::Navigation("session has no page".to_string()))?;

        timeout(self.load_timeout, page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(self.load_timeout))?
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;

        sleep(settle).await;

        page.url()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?
            .ok_or(BrowserError::NoAddress)
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!(error = %e, "Page close failed");
            }
        }
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Waiting for browser exit failed");
        }
        self.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile).await {
            debug!(error = %e, profile = %self.profile.display(), "Profile cleanup failed");
        }
        info!("Browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ChromeOptions::default();
        assert!(options.headless);
        assert_eq!(options.load_timeout, Duration::from_secs(30));
        assert!(options.executable.is_none());
    }

    #[test]
    fn test_profile_dirs_are_unique() {
        let sessions = ChromeSessions::new(ChromeOptions::default());
        let a = sessions.profile_dir();
        let b = sessions.profile_dir();
        assert_ne!(a, b);
        assert!(a.starts_with(std::env::temp_dir()));
    }
}
