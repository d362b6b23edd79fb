//! Run configuration.
//!
//! Settings come from three layers, highest first: command-line flags, the
//! optional YAML run file, and built-in defaults. A run file looks like:
//!
//! ```yaml
//! queries:
//!   - renewable energy
//!   - grid storage
//! recency: 7d
//! locale: US
//! quota: 20
//! max_workers: 3
//! max_failures: 2
//! ```

use crate::browser::ChromeOptions;
use crate::cli::{BrowserArgs, ExtractArgs, SearchArgs, SummarizeArgs};
use crate::error::{Result, SentinelError};
use crate::extractor::{ExtractionPaths, ExtractorConfig};
use crate::models::{Recency, SearchParams};
use crate::outputs::{artifacts, json};
use crate::resolver::ResolverConfig;
use crate::summarizer::SummarizerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_LOCALE: &str = "IN";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_QUOTA: usize = 10;
pub const DEFAULT_TEMPLATE: &str = "news_summarizer";

/// Contents of a YAML run file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunFile {
    pub queries: Vec<String>,
    pub recency: Option<Recency>,
    pub locale: Option<String>,
    pub language: Option<String>,
    pub quota: Option<usize>,
    pub max_workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub settle_ms: Option<u64>,
    pub max_failures: Option<u32>,
    pub template: Option<String>,
    pub max_input_tokens: Option<usize>,
    pub concurrency: Option<usize>,
}

impl RunFile {
    pub fn parse(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not a map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = artifacts::read_text(path).await?;
        let file = Self::parse(&yaml)
            .map_err(|e| SentinelError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), queries = file.queries.len(), "Loaded run file");
        Ok(file)
    }

    /// Load `path` if given, otherwise an empty run file.
    pub async fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Queries and search parameters. Queries given on the command line
    /// replace the file's list rather than extending it.
    pub fn search(&self, args: &SearchArgs) -> (Vec<String>, SearchParams) {
        let queries = if args.queries.is_empty() {
            self.queries.clone()
        } else {
            args.queries.clone()
        };
        let params = SearchParams {
            locale: args
                .locale
                .clone()
                .or_else(|| self.locale.clone())
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            language: args
                .language
                .clone()
                .or_else(|| self.language.clone())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            recency: args.recency.or(self.recency).unwrap_or_default(),
            total_quota: args.quota.or(self.quota).unwrap_or(DEFAULT_QUOTA),
        };
        (queries, params)
    }

    pub fn resolver(&self, args: &BrowserArgs) -> ResolverConfig {
        let defaults = ResolverConfig::default();
        ResolverConfig {
            max_workers: args
                .max_workers
                .or(self.max_workers)
                .unwrap_or(defaults.max_workers),
            batch_size: args.batch_size.or(self.batch_size).unwrap_or(defaults.batch_size),
            settle_delay: args
                .settle_ms
                .or(self.settle_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
        }
    }

    pub fn extractor(&self, args: &ExtractArgs) -> ExtractorConfig {
        ExtractorConfig {
            max_consecutive_failures: args
                .max_failures
                .or(self.max_failures)
                .unwrap_or(ExtractorConfig::default().max_consecutive_failures),
        }
    }

    pub fn summarizer(&self, args: &SummarizeArgs) -> SummarizerConfig {
        let defaults = SummarizerConfig::default();
        SummarizerConfig {
            max_input_tokens: args
                .max_input_tokens
                .or(self.max_input_tokens)
                .unwrap_or(defaults.max_input_tokens),
            concurrency: args.concurrency.or(self.concurrency).unwrap_or(defaults.concurrency),
        }
    }

    pub fn template<'a>(&'a self, args: &'a SummarizeArgs) -> &'a str {
        args.template
            .as_deref()
            .or(self.template.as_deref())
            .unwrap_or(DEFAULT_TEMPLATE)
    }
}

pub fn chrome_options(args: &BrowserArgs, timeout: Duration) -> ChromeOptions {
    ChromeOptions {
        headless: !args.headful,
        load_timeout: timeout,
        executable: args.chrome_path.clone(),
        no_sandbox: args.no_sandbox,
    }
}

/// Pipeline stages in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Discover,
    Resolve,
    Extract,
    Summarize,
}

/// Default artifact locations inside the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn candidates(&self) -> PathBuf {
        self.dir.join("links_temp.txt")
    }

    pub fn resolved(&self) -> PathBuf {
        self.dir.join("links.txt")
    }

    pub fn headings(&self) -> PathBuf {
        self.dir.join("heading.txt")
    }

    pub fn content(&self) -> PathBuf {
        self.dir.join("content.txt")
    }

    pub fn summaries(&self) -> PathBuf {
        self.dir.join("summaries.txt")
    }

    pub fn report(&self) -> PathBuf {
        self.dir.join("report.json")
    }

    /// Text artifacts written by the stages that run after `stage`.
    pub fn outputs_after(&self, stage: Stage) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if stage < Stage::Resolve {
            paths.push(self.resolved());
        }
        if stage < Stage::Extract {
            paths.push(self.headings());
            paths.push(self.content());
        }
        if stage < Stage::Summarize {
            paths.push(self.summaries());
        }
        paths
    }

    /// Empty every artifact downstream of `stage` and write an empty report.
    ///
    /// A run that stops early calls this so that files left by an earlier
    /// run cannot be mistaken for, or misaligned with, this run's output.
    /// The failure ledger is kept, since it spans runs.
    ///
    /// # Errors
    ///
    /// [`SentinelError::ArtifactWrite`] if any file cannot be replaced.
    pub async fn clear_after(&self, stage: Stage, queries: &[String]) -> Result<()> {
        for path in self.outputs_after(stage) {
            artifacts::write_atomic(&path, "").await?;
        }
        let empty = json::build_report("", "", queries);
        json::save_report(&empty, &self.report()).await?;
        info!(?stage, dir = %self.dir.display(), "Cleared downstream artifacts");
        Ok(())
    }

    /// Extraction paths with optional per-file overrides.
    pub fn extraction(
        &self,
        urls: Option<PathBuf>,
        headings: Option<PathBuf>,
        content: Option<PathBuf>,
    ) -> ExtractionPaths {
        ExtractionPaths {
            urls: urls.unwrap_or_else(|| self.resolved()),
            headings: headings.unwrap_or_else(|| self.headings()),
            content: content.unwrap_or_else(|| self.content()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_FILE: &str = "\
queries:
  - renewable energy
  - grid storage
recency: 7d
locale: US
quota: 20
max_workers: 3
settle_ms: 500
max_failures: 0
template: short_news
";

    #[test]
    fn test_parse_run_file() {
        let file = RunFile::parse(RUN_FILE).unwrap();
        assert_eq!(file.queries, vec!["renewable energy", "grid storage"]);
        assert_eq!(file.recency, Some(Recency::LastWeek));
        assert_eq!(file.quota, Some(20));
        assert_eq!(file.batch_size, None);
    }

    #[test]
    fn test_empty_and_unknown_keys() {
        assert_eq!(RunFile::parse("").unwrap(), RunFile::default());
        assert!(RunFile::parse("queries: [a]\nworkers: 3\n").is_err());
    }

    #[test]
    fn test_defaults_without_file_or_flags() {
        let file = RunFile::default();
        let (queries, params) = file.search(&SearchArgs::default());
        assert!(queries.is_empty());
        assert_eq!(params.locale, "IN");
        assert_eq!(params.language, "en");
        assert_eq!(params.recency, Recency::Anytime);
        assert_eq!(params.total_quota, 10);

        let resolver = file.resolver(&BrowserArgs::default());
        assert_eq!(resolver.max_workers, 5);
        assert_eq!(resolver.batch_size, 10);
        assert_eq!(resolver.settle_delay, Duration::from_secs(2));

        assert_eq!(file.extractor(&ExtractArgs::default()).max_consecutive_failures, 3);
        assert_eq!(file.summarizer(&SummarizeArgs::default()).max_input_tokens, 1024);
        assert_eq!(file.template(&SummarizeArgs::default()), DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_flags_override_file() {
        let file = RunFile::parse(RUN_FILE).unwrap();

        let args = SearchArgs {
            queries: vec!["solar".to_string()],
            quota: Some(4),
            ..SearchArgs::default()
        };
        let (queries, params) = file.search(&args);
        assert_eq!(queries, vec!["solar"]);
        assert_eq!(params.total_quota, 4);
        assert_eq!(params.locale, "US");
        assert_eq!(params.recency, Recency::LastWeek);

        let resolver = file.resolver(&BrowserArgs {
            batch_size: Some(2),
            ..BrowserArgs::default()
        });
        assert_eq!(resolver.max_workers, 3);
        assert_eq!(resolver.batch_size, 2);
        assert_eq!(resolver.settle_delay, Duration::from_millis(500));

        assert_eq!(file.extractor(&ExtractArgs::default()).max_consecutive_failures, 0);
        let llm = SummarizeArgs {
            template: Some("other".to_string()),
            ..SummarizeArgs::default()
        };
        assert_eq!(file.template(&llm), "other");
        assert_eq!(file.template(&SummarizeArgs::default()), "short_news");
    }

    #[test]
    fn test_chrome_options_from_flags() {
        let args = BrowserArgs {
            headful: true,
            no_sandbox: true,
            chrome_path: Some(PathBuf::from("/usr/bin/chromium")),
            ..BrowserArgs::default()
        };
        let options = chrome_options(&args, Duration::from_secs(12));
        assert!(!options.headless);
        assert!(options.no_sandbox);
        assert_eq!(options.load_timeout, Duration::from_secs(12));
        assert_eq!(options.executable, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactPaths::new("/tmp/run");
        assert_eq!(paths.candidates(), PathBuf::from("/tmp/run/links_temp.txt"));
        assert_eq!(paths.report(), PathBuf::from("/tmp/run/report.json"));

        let extraction = paths.extraction(None, Some(PathBuf::from("h.txt")), None);
        assert_eq!(extraction.urls, PathBuf::from("/tmp/run/links.txt"));
        assert_eq!(extraction.headings, PathBuf::from("h.txt"));
        assert_eq!(extraction.content, PathBuf::from("/tmp/run/content.txt"));
    }

    fn seed_stale_run(paths: &ArtifactPaths) {
        for path in [
            paths.candidates(),
            paths.resolved(),
            paths.headings(),
            paths.content(),
            paths.summaries(),
        ] {
            std::fs::write(path, "stale\n").unwrap();
        }
        std::fs::write(paths.report(), r#"{"articles":["stale"]}"#).unwrap();
    }

    #[tokio::test]
    async fn test_clear_after_extract_drops_stale_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        seed_stale_run(&paths);

        paths
            .clear_after(Stage::Extract, &["solar".to_string()])
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(paths.summaries()).unwrap(), "");
        assert_eq!(std::fs::read_to_string(paths.headings()).unwrap(), "stale\n");
        assert_eq!(std::fs::read_to_string(paths.resolved()).unwrap(), "stale\n");

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(paths.report()).unwrap()).unwrap();
        assert_eq!(report["articles"].as_array().unwrap().len(), 0);
        assert_eq!(report["queries"][0], "solar");
    }

    #[tokio::test]
    async fn test_clear_after_discover_empties_everything_downstream() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(tmp.path());
        seed_stale_run(&paths);
        let ledger = tmp.path().join("links.txt.failures.json");
        std::fs::write(&ledger, "{}").unwrap();

        paths.clear_after(Stage::Discover, &[]).await.unwrap();

        for path in [paths.resolved(), paths.headings(), paths.content(), paths.summaries()] {
            assert_eq!(std::fs::read_to_string(&path).unwrap(), "", "{}", path.display());
        }
        assert_eq!(std::fs::read_to_string(paths.candidates()).unwrap(), "stale\n");
        assert!(ledger.exists());
    }

    #[test]
    fn test_outputs_after_summarize_is_empty() {
        let paths = ArtifactPaths::new("/tmp/run");
        assert!(paths.outputs_after(Stage::Summarize).is_empty());
        assert_eq!(paths.outputs_after(Stage::Resolve).len(), 3);
    }

    #[tokio::test]
    async fn test_load_reports_bad_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("run.yaml");
        std::fs::write(&path, "quota: [not, a, number]\n").unwrap();

        let err = RunFile::load(&path).await.unwrap_err();
        assert!(matches!(err, SentinelError::Config(_)));

        let missing = RunFile::load(&tmp.path().join("nope.yaml")).await.unwrap_err();
        assert!(matches!(missing, SentinelError::ArtifactRead { .. }));
        assert_eq!(RunFile::load_optional(None).await.unwrap(), RunFile::default());
    }
}
