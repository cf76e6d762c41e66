//! `feedsweep` binary: runs one crawl cycle and exits.
//!
//! Items are written as JSON Lines to `--output` (stdout by default); logs go
//! to stderr and are filtered with `RUST_LOG` (default `info`).  An `--output`
//! file is staged next to its destination and only replaces it once the cycle
//! has committed.
//!
//! Exit status is non-zero only for cycle-level failures: clock skew, a
//! fetch-state commit failure, or an output failure.  Individual feed and
//! entry problems are logged as warnings.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use feedsweep::config::FeedRegistry;
use feedsweep::crawl::{CrawlCoordinator, CrawlSettings};
use feedsweep::output::{JsonLines, StagedFile};
use feedsweep::source::HttpTransport;
use feedsweep::state::FetchStateStore;
use feedsweep::translate::{HttpTranslator, TranslationAdapter};

#[derive(Parser)]
#[command(name = "feedsweep", version, about = "Fetch due RSS feeds and emit recent entries")]
struct Cli {
    /// Feed configuration (JSON: {"feeds": [...]})
    #[arg(long)]
    feeds: PathBuf,

    /// Fetch-state file, rewritten atomically at the end of the cycle
    #[arg(long)]
    fetch_times: PathBuf,

    /// Keep entries published within this many hours
    #[arg(long)]
    hours: u64,

    /// Maximum number of feeds processed at once
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// Per-feed timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Write items here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base URL of a LibreTranslate-compatible service
    #[arg(long)]
    translate_url: Option<String>,

    /// Language of the feeds
    #[arg(long, default_value = "auto")]
    source_lang: String,

    /// Translate entries into this language (requires --translate-url)
    #[arg(long)]
    target_lang: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let feed_timeout = Duration::from_secs(cli.timeout);

    // -- collaborators -------------------------------------------------------
    let registry = FeedRegistry::load(&cli.feeds)
        .with_context(|| format!("loading feeds from {}", cli.feeds.display()))?;
    if registry.is_empty() {
        warn!(path = %cli.feeds.display(), "no feeds configured");
    }
    let store = FetchStateStore::load(&cli.fetch_times)?;
    let transport = HttpTransport::new(feed_timeout).context("building HTTP client")?;

    info!(
        feeds = registry.len(),
        enabled = registry.enabled().count(),
        hours = cli.hours,
        "considering last {} hours",
        cli.hours
    );

    let settings = CrawlSettings {
        retention_hours: cli.hours,
        concurrency: cli.concurrency,
        feed_timeout,
    };
    let mut crawl = CrawlCoordinator::new(registry, store, Arc::new(transport), settings);

    match (cli.translate_url.as_deref(), cli.target_lang) {
        (Some(url), Some(target)) => {
            let translator =
                HttpTranslator::new(url, feed_timeout).context("building translation client")?;
            info!(url, source = %cli.source_lang, target = %target, "translation enabled");
            crawl = crawl.with_translation(TranslationAdapter::new(
                Arc::new(translator),
                cli.source_lang,
                target,
            ));
        }
        (None, None) => {}
        _ => warn!("translation needs both --translate-url and --target-lang; disabled"),
    }

    // -- run one cycle -------------------------------------------------------
    let report = match &cli.output {
        Some(path) => {
            let staged =
                StagedFile::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut sink = JsonLines::new(staged);
            let report = crawl.run_cycle(&mut sink).await?;
            sink.into_inner()
                .persist()
                .with_context(|| format!("replacing {}", path.display()))?;
            report
        }
        None => {
            let mut sink = JsonLines::new(BufWriter::new(io::stdout()));
            crawl.run_cycle(&mut sink).await?
        }
    };
    info!(
        due = report.due.len(),
        fetched = report.fetched.len(),
        failed = report.failed.len(),
        items = report.items,
        "done"
    );
    Ok(())
}
