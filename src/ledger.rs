//! Consecutive extraction failures per URL.
//!
//! A URL that fails extraction for a reason other than an explicit block is
//! kept in the link list so a later run can retry it. The ledger counts those
//! failures across runs; once a URL reaches the configured threshold the
//! extractor drops it. A successful extraction clears the count.
//!
//! The ledger lives next to the link list as `<links file>.failures.json`.

use crate::error::{Result, SentinelError};
use crate::outputs::artifacts::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLedger {
    #[serde(default)]
    failures: BTreeMap<String, u32>,
}

impl FailureLedger {
    /// Sidecar path for a link list.
    pub fn path_for(urls_path: &Path) -> PathBuf {
        let name = urls_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "links".to_string());
        urls_path.with_file_name(format!("{name}.failures.json"))
    }

    /// Load the ledger, starting empty if it does not exist or is unreadable
    /// as JSON.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(ledger) => Ok(ledger),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failure ledger is corrupt; starting fresh");
                    Ok(Self::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SentinelError::read(path, e)),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SentinelError::write(path, e.into()))?;
        write_atomic(path, &json).await?;
        debug!(path = %path.display(), entries = self.failures.len(), "Saved failure ledger");
        Ok(())
    }

    /// Count a failure and return the new consecutive total.
    pub fn record_failure(&mut self, url: &str) -> u32 {
        let count = self.failures.entry(url.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn record_success(&mut self, url: &str) {
        self.failures.remove(url);
    }

    pub fn failures(&self, url: &str) -> u32 {
        self.failures.get(url).copied().unwrap_or(0)
    }

    /// Forget URLs that are no longer in the link list.
    pub fn retain_only(&mut self, urls: &[String]) {
        self.failures.retain(|url, _| urls.iter().any(|u| u == url));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}
