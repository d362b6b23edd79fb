//! Command-line interface definitions for News Sentinel.
//!
//! Every stage has its own subcommand so it can be re-run against the
//! artifacts of the previous one. `run` chains all of them. Options left
//! unset fall back to the YAML run file given with `--config`, then to the
//! built-in defaults.

use crate::models::Recency;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for News Sentinel.
///
/// # Examples
///
/// ```sh
/// # Whole pipeline into ./out
/// news_sentinel -d ./out run -q "renewable energy" -q "grid storage" --quota 20
///
/// # Re-run extraction only, retiring links after two failed attempts
/// news_sentinel -d ./out extract --max-failures 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the run's artifacts
    #[arg(short = 'd', long, global = true, env = "NEWS_SENTINEL_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Optional YAML run file with queries and stage defaults
    #[arg(short, long, global = true, env = "NEWS_SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP and page-load timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Skip the randomized delays between requests
    #[arg(long, global = true)]
    pub no_pacing: bool,

    /// User-Agent to send instead of the built-in rotation; repeat to rotate
    #[arg(long = "user-agent", global = true)]
    pub user_agents: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for candidate article links
    Discover {
        #[command(flatten)]
        search: SearchArgs,

        /// Candidate links file [default: <output-dir>/links_temp.txt]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Follow each candidate link to its final address
    Resolve {
        #[command(flatten)]
        browser: BrowserArgs,

        /// Candidate links file [default: <output-dir>/links_temp.txt]
        #[arg(long)]
        input: Option<PathBuf>,

        /// Resolved links file [default: <output-dir>/links.txt]
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fetch resolved links and extract titles and text
    Extract {
        #[command(flatten)]
        extract: ExtractArgs,

        /// Resolved links file, rewritten in place [default: <output-dir>/links.txt]
        #[arg(long)]
        urls: Option<PathBuf>,

        /// Headings file [default: <output-dir>/heading.txt]
        #[arg(long)]
        headings: Option<PathBuf>,

        /// Content file [default: <output-dir>/content.txt]
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Summarize every extracted article
    Summarize {
        #[command(flatten)]
        llm: SummarizeArgs,

        /// Content file [default: <output-dir>/content.txt]
        #[arg(long)]
        content: Option<PathBuf>,

        /// Summaries file [default: <output-dir>/summaries.txt]
        #[arg(long)]
        summaries: Option<PathBuf>,
    },

    /// Run every stage and write a JSON report
    Run {
        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        browser: BrowserArgs,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        llm: SummarizeArgs,

        /// Stop after extraction
        #[arg(long)]
        skip_summaries: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Search term; repeat for several queries
    #[arg(short = 'q', long = "query")]
    pub queries: Vec<String>,

    /// How far back to search
    #[arg(long, value_enum)]
    pub recency: Option<Recency>,

    /// Country code of the search edition
    #[arg(long)]
    pub locale: Option<String>,

    /// Interface language of the search edition
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum number of links for the whole run
    #[arg(long)]
    pub quota: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BrowserArgs {
    /// Browser sessions running at once
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Links handled by one session
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Wait after each page load before reading the address, in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Chrome or Chromium executable
    #[arg(long, env = "CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Show browser windows
    #[arg(long)]
    pub headful: bool,

    /// Launch the browser without its sandbox (containers running as root)
    #[arg(long)]
    pub no_sandbox: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExtractArgs {
    /// Consecutive failed runs before a link is dropped; 0 keeps it forever
    #[arg(long)]
    pub max_failures: Option<u32>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SummarizeArgs {
    /// awful_aj chat template used to summarize
    #[arg(long)]
    pub template: Option<String>,

    /// awful_aj config.yaml [default: awful_aj config directory]
    #[arg(long, env = "AWFUL_AJ_CONFIG")]
    pub llm_config: Option<PathBuf>,

    /// Words of article text sent to the model
    #[arg(long)]
    pub max_input_tokens: Option<usize>,

    /// Articles summarized at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_parsing() {
        let cli = Cli::parse_from([
            "news_sentinel",
            "discover",
            "-q",
            "renewable energy",
            "--query",
            "grid storage",
            "--recency",
            "7d",
            "--quota",
            "12",
        ]);

        let Command::Discover { search, output } = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(search.queries, vec!["renewable energy", "grid storage"]);
        assert_eq!(search.recency, Some(Recency::LastWeek));
        assert_eq!(search.quota, Some(12));
        assert_eq!(search.locale, None);
        assert_eq!(output, None);
        assert_eq!(cli.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "news_sentinel",
            "resolve",
            "--batch-size",
            "2",
            "--max-workers",
            "2",
            "-d",
            "/tmp/run",
            "--no-pacing",
            "--no-sandbox",
        ]);

        assert_eq!(cli.output_dir, PathBuf::from("/tmp/run"));
        assert!(cli.no_pacing);
        assert_eq!(cli.timeout_secs, 30);
        assert!(cli.user_agents.is_empty());
        let Command::Resolve { browser, input, .. } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(browser.batch_size, Some(2));
        assert_eq!(browser.max_workers, Some(2));
        assert!(browser.no_sandbox);
        assert!(!browser.headful);
        assert_eq!(input, None);
    }

    #[test]
    fn test_run_accepts_every_stage_option() {
        let cli = Cli::parse_from([
            "news_sentinel",
            "run",
            "-q",
            "solar",
            "--settle-ms",
            "500",
            "--max-failures",
            "0",
            "--template",
            "short_summary",
            "--skip-summaries",
        ]);

        let Command::Run {
            search,
            browser,
            extract,
            llm,
            skip_summaries,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(search.queries, vec!["solar"]);
        assert_eq!(browser.settle_ms, Some(500));
        assert_eq!(extract.max_failures, Some(0));
        assert_eq!(llm.template.as_deref(), Some("short_summary"));
        assert!(skip_summaries);
    }

    #[test]
    fn test_unknown_recency_rejected() {
        let res = Cli::try_parse_from(["news_sentinel", "discover", "--recency", "2w"]);
        assert!(res.is_err());
    }
}
