//! Run-fatal error conditions.
//!
//! Item-level failures (one query, one link, one article) are logged and
//! absorbed by the stage that hit them. Only the conditions below stop a run,
//! and each names the artifact or setting that caused it so the caller can
//! tell "could not read the link list" apart from "browser would not start".

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("cannot read artifact {}: {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("summarizer setup failed: {0}")]
    Summarizer(String),
}

impl SentinelError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SentinelError::ArtifactRead {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SentinelError::ArtifactWrite {
            path: path.into(),
            source,
        }
    }
}
