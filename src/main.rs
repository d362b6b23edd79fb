//! # News Sentinel
//!
//! A news acquisition pipeline that searches Google News for a set of
//! queries, follows every result through its redirect chain to the
//! publisher's page, extracts the article text, and has an LLM summarize it.
//!
//! ## Features
//!
//! - Quota-bounded discovery across several queries with first-seen dedup
//! - Redirect resolution in headless Chromium, batched across a worker pool
//!   with input order preserved
//! - Extraction that drops links the origin refuses (403) and retires links
//!   that keep failing
//! - Summaries through an OpenAI-compatible API via `awful_aj`
//! - A JSON report joining titles, links and summaries
//!
//! ## Usage
//!
//! ```sh
//! news_sentinel -d ./out run -q "renewable energy" --recency 7d --quota 20
//! ```
//!
//! ## Architecture
//!
//! Stages communicate through plain-text artifacts in the output directory:
//! 1. **Discover**: queries → `links_temp.txt`
//! 2. **Resolve**: `links_temp.txt` → `links.txt` (same length and order)
//! 3. **Extract**: `links.txt` → `heading.txt` + `content.txt`, and
//!    `links.txt` rewritten without refused links
//! 4. **Summarize**: `content.txt` → `summaries.txt`
//! 5. **Report** (`run` only): `heading.txt` + `summaries.txt` → `report.json`

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod browser;
mod cli;
mod config;
mod discovery;
mod error;
mod extractor;
mod fetch;
mod ledger;
mod models;
mod outputs;
mod pacing;
mod resolver;
mod scrapers;
mod summarizer;
mod utils;

use api::{Backoff, LlmSummarizer, Retrying};
use browser::ChromeSessions;
use cli::{BrowserArgs, Cli, Command, ExtractArgs, SearchArgs, SummarizeArgs};
use config::{ArtifactPaths, RunFile, Stage, chrome_options};
use discovery::Discovery;
use error::Result;
use extractor::{ExtractionPaths, Extractor};
use fetch::{FetchClient, RotatingIdentity};
use outputs::{artifacts, json};
use pacing::HumanPacing;
use resolver::Resolver;
use scrapers::google_news::GoogleNewsLinks;
use summarizer::Summarizer;
use utils::ensure_writable_dir;

/// Settings every stage needs.
struct Context {
    run_file: RunFile,
    paths: ArtifactPaths,
    timeout: Duration,
    no_pacing: bool,
    user_agents: Vec<String>,
}

impl Context {
    fn pacing(&self) -> HumanPacing {
        if self.no_pacing {
            HumanPacing::disabled()
        } else {
            HumanPacing::default()
        }
    }

    /// One request in flight at a time; the origins throttle anything faster.
    fn fetch_client(&self) -> Result<FetchClient<RotatingIdentity>> {
        let identity = RotatingIdentity::or_default(self.user_agents.clone());
        Ok(FetchClient::new(identity, self.timeout, 1)?)
    }
}

#[tokio::main]
#[instrument]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("news_sentinel starting up");

    let args = Cli::parse();
    debug!(?args.output_dir, ?args.config, "Parsed CLI arguments");

    let ctx = Context {
        run_file: RunFile::load_optional(args.config.as_deref()).await?,
        paths: ArtifactPaths::new(&args.output_dir),
        timeout: Duration::from_secs(args.timeout_secs),
        no_pacing: args.no_pacing,
        user_agents: args.user_agents,
    };

    // Early check: fail on an unwritable output dir before any network work
    if let Err(e) = ensure_writable_dir(ctx.paths.dir()).await {
        error!(
            path = %ctx.paths.dir().display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let outcome = match args.command {
        Command::Discover { search, output } => {
            let output = output.unwrap_or_else(|| ctx.paths.candidates());
            discover(&ctx, &search, &output).await.map(drop)
        }
        Command::Resolve {
            browser,
            input,
            output,
        } => {
            let input = input.unwrap_or_else(|| ctx.paths.candidates());
            let output = output.unwrap_or_else(|| ctx.paths.resolved());
            resolve(&ctx, &browser, &input, &output).await
        }
        Command::Extract {
            extract: extract_args,
            urls,
            headings,
            content,
        } => {
            let paths = ctx.paths.extraction(urls, headings, content);
            extract(&ctx, &extract_args, &paths).await.map(drop)
        }
        Command::Summarize {
            llm,
            content,
            summaries,
        } => {
            let content = content.unwrap_or_else(|| ctx.paths.content());
            let summaries = summaries.unwrap_or_else(|| ctx.paths.summaries());
            summarize(&ctx, &llm, &content, &summaries).await
        }
        Command::Run {
            search,
            browser,
            extract,
            llm,
            skip_summaries,
        } => run(&ctx, &search, &browser, &extract, &llm, skip_summaries).await,
    };

    if let Err(e) = outcome {
        error!(error = %e, "Run failed");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

#[instrument(level = "info", skip_all, fields(output = %output.display()))]
async fn discover(ctx: &Context, search: &SearchArgs, output: &Path) -> Result<usize> {
    let (queries, params) = ctx.run_file.search(search);
    let discovery = Discovery::new(ctx.fetch_client()?, GoogleNewsLinks::default(), ctx.pacing());

    let links = discovery.discover(&queries, &params).await?;
    artifacts::write_lines(output, &links).await?;
    info!(count = links.len(), "Wrote candidate links");
    Ok(links.len())
}

#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
async fn resolve(ctx: &Context, browser: &BrowserArgs, input: &Path, output: &Path) -> Result<()> {
    let links = artifacts::read_lines(input).await?;
    let sessions = ChromeSessions::new(chrome_options(browser, ctx.timeout));
    let resolver = Resolver::new(sessions, ctx.run_file.resolver(browser));

    let resolved = resolver.resolve(&links).await;
    let changed = resolved.iter().zip(&links).filter(|(r, l)| r != l).count();

    artifacts::write_lines(output, &resolved).await?;
    info!(total = resolved.len(), changed, "Wrote resolved links");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(urls = %paths.urls.display()))]
async fn extract(ctx: &Context, args: &ExtractArgs, paths: &ExtractionPaths) -> Result<usize> {
    let extractor = Extractor::new(ctx.fetch_client()?, ctx.pacing(), ctx.run_file.extractor(args));

    let extraction = extractor.extract_files(paths).await?;
    Ok(extraction.articles.len())
}

#[instrument(level = "info", skip_all, fields(content = %content.display()))]
async fn summarize(ctx: &Context, args: &SummarizeArgs, content: &Path, summaries: &Path) -> Result<()> {
    let backend = LlmSummarizer::load(args.llm_config.as_deref(), ctx.run_file.template(args)).await?;
    let summarizer = Summarizer::new(
        Retrying::new(backend, Backoff::default()),
        ctx.run_file.summarizer(args),
    );

    summarizer.summarize_files(content, summaries).await?;
    Ok(())
}

/// Run every stage in order.
///
/// Each run replaces every artifact of the previous one. When a stage
/// leaves nothing for the next, the remaining artifacts are emptied and an
/// empty report is written rather than leaving stale files behind.
async fn run(
    ctx: &Context,
    search: &SearchArgs,
    browser: &BrowserArgs,
    extract_args: &ExtractArgs,
    llm: &SummarizeArgs,
    skip_summaries: bool,
) -> Result<()> {
    let paths = &ctx.paths;
    let (queries, _) = ctx.run_file.search(search);

    let discovered = discover(ctx, search, &paths.candidates()).await?;
    if discovered == 0 {
        info!("No links discovered; nothing else to do");
        return paths.clear_after(Stage::Discover, &queries).await;
    }

    resolve(ctx, browser, &paths.candidates(), &paths.resolved()).await?;

    let extraction = paths.extraction(None, None, None);
    let extracted = extract(ctx, extract_args, &extraction).await?;
    if skip_summaries || extracted == 0 {
        info!(extracted, skip_summaries, "Skipping summaries");
        return paths.clear_after(Stage::Extract, &queries).await;
    }

    summarize(ctx, llm, &paths.content(), &paths.summaries()).await?;

    let report = json::write_report(&paths.headings(), &paths.summaries(), &paths.report(), &queries).await?;
    info!(
        articles = report.articles.len(),
        path = %paths.report().display(),
        "Run complete"
    );
    Ok(())
}
