//! One crawl cycle, end to end.
//!
//! ```text
//!  Idle ──► Scheduling ──► Fetching (one task per due feed) ──► Committing ──► Idle
//! ```
//!
//! * **Scheduling** evaluates every feed against a snapshot of the fetch
//!   state.  Clock skew on any feed aborts the cycle before anything is
//!   fetched.
//! * **Fetching** runs one task per due feed, bounded by a semaphore and a
//!   per-feed timeout.  Each task does fetch → parse → filter → normalise →
//!   translate → assemble.  Once a feed's items have been handed to the sink,
//!   the cycle's `now` is recorded for it.  Failures stay inside their feed.
//! * **Committing** runs once every task has finished: the sink is flushed,
//!   then the fetch state is atomically committed.
//!
//! Nothing carries over between cycles except the committed fetch state: a
//! cycle that fails rolls the store's working map back to where it started.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{FeedDescriptor, FeedRegistry};
use crate::error::{CycleError, FetchError, ParseFailure};
use crate::filter::{self, Filtered};
use crate::item::{self, Item};
use crate::normalize::{normalize, strip_markup};
use crate::output::ItemSink;
use crate::schedule;
use crate::source::{self, Transport};
use crate::state::FetchStateStore;
use crate::translate::TranslationAdapter;

/// Tunables for a cycle.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Entries older than this many hours before `now` are dropped.
    pub retention_hours: u64,
    /// Maximum number of feeds processed at once.
    pub concurrency: usize,
    /// A feed still running after this long is abandoned as a fetch failure.
    pub feed_timeout: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            retention_hours: 24,
            concurrency: 16,
            feed_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scheduling,
    Fetching,
    Committing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Scheduling => "scheduling",
            Phase::Fetching => "fetching",
            Phase::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Summary of a committed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub now: i64,
    pub cutoff_ts: i64,
    /// Feeds that were due, in configuration order.
    pub due: Vec<String>,
    /// Feeds fetched and parsed successfully, in completion order.
    pub fetched: Vec<String>,
    /// Feeds that failed to fetch, parse or finish in time.
    pub failed: Vec<String>,
    pub items: usize,
    pub malformed_entries: usize,
}

/// Why a single feed produced nothing this cycle.
#[derive(Debug, Error)]
enum FeedFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

struct FeedOutput {
    items: Vec<Item>,
    malformed: usize,
}

/// Owns a crawl cycle from scheduling to commit.
pub struct CrawlCoordinator {
    registry: Arc<FeedRegistry>,
    store: FetchStateStore,
    transport: Arc<dyn Transport>,
    translation: Option<Arc<TranslationAdapter>>,
    settings: CrawlSettings,
    phase: Phase,
}

impl CrawlCoordinator {
    pub fn new(
        registry: FeedRegistry,
        store: FetchStateStore,
        transport: Arc<dyn Transport>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            transport,
            translation: None,
            settings,
            phase: Phase::Idle,
        }
    }

    /// Translate every retained entry with `adapter`.
    pub fn with_translation(mut self, adapter: TranslationAdapter) -> Self {
        self.translation = Some(Arc::new(adapter));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &FetchStateStore {
        &self.store
    }

    /// Run a cycle at the current wall-clock time.
    pub async fn run_cycle(&mut self, sink: &mut dyn ItemSink) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(Utc::now().timestamp(), sink).await
    }

    /// Run a cycle as if the time were `now` (seconds since the epoch).
    pub async fn run_cycle_at(
        &mut self,
        now: i64,
        sink: &mut dyn ItemSink,
    ) -> Result<CycleReport, CycleError> {
        let checkpoint = self.store.snapshot();
        let result = self.cycle(now, sink).await;
        if result.is_err() {
            self.store.restore(checkpoint);
        }
        self.enter(Phase::Idle);
        result
    }

    async fn cycle(&mut self, now: i64, sink: &mut dyn ItemSink) -> Result<CycleReport, CycleError> {
        self.enter(Phase::Scheduling);
        let snapshot = self.store.snapshot();
        let due: Vec<FeedDescriptor> = schedule::due_feeds(&self.registry, &snapshot, now)?
            .into_iter()
            .cloned()
            .collect();
        let cutoff_ts = filter::cutoff(now, self.settings.retention_hours);
        info!(
            due = due.len(),
            configured = self.registry.len(),
            now,
            cutoff_ts,
            "scheduled crawl cycle"
        );

        let mut report = CycleReport {
            now,
            cutoff_ts,
            due: due.iter().map(|f| f.name.clone()).collect(),
            ..Default::default()
        };

        self.enter(Phase::Fetching);
        let limiter = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();
        for feed in due {
            let name = feed.name.clone();
            let job = FeedJob {
                feed,
                transport: Arc::clone(&self.transport),
                translation: self.translation.clone(),
                limiter: Arc::clone(&limiter),
                cutoff_ts,
                now,
                timeout: self.settings.feed_timeout,
            };
            let handle = tasks.spawn(job.run());
            names.insert(handle.id(), name);
        }

        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    error!(feed = %name, error = %e, "feed task did not complete");
                    report.failed.push(name);
                    continue;
                }
            };
            match outcome {
                Ok(output) => {
                    sink.emit(&output.items).map_err(CycleError::Output)?;
                    let previous = self.store.get(&name);
                    self.store.record(&name, now);
                    debug!(
                        feed = %name,
                        items = output.items.len(),
                        previous_fetch_ts = previous,
                        fetch_ts = now,
                        "feed processed"
                    );
                    report.items += output.items.len();
                    report.malformed_entries += output.malformed;
                    report.fetched.push(name);
                }
                Err(failure) => {
                    warn!(feed = %name, error = %failure, "feed skipped this cycle");
                    report.failed.push(name);
                }
            }
        }
        sink.flush().map_err(CycleError::Output)?;

        self.enter(Phase::Committing);
        self.store.commit()?;
        info!(
            fetched = report.fetched.len(),
            failed = report.failed.len(),
            items = report.items,
            malformed_entries = report.malformed_entries,
            path = %self.store.path().display(),
            "crawl cycle committed"
        );
        Ok(report)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "crawl phase");
        self.phase = phase;
    }
}

/// Everything one feed task needs, owned so the task can be spawned.
struct FeedJob {
    feed: FeedDescriptor,
    transport: Arc<dyn Transport>,
    translation: Option<Arc<TranslationAdapter>>,
    limiter: Arc<Semaphore>,
    cutoff_ts: i64,
    now: i64,
    timeout: Duration,
}

impl FeedJob {
    async fn run(self) -> (String, Result<FeedOutput, FeedFailure>) {
        // The semaphore is never closed, so acquisition only fails if it is.
        let _permit = Arc::clone(&self.limiter).acquire_owned().await.ok();

        let outcome = match tokio::time::timeout(self.timeout, self.process()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(self.timeout).into()),
        };
        (self.feed.name, outcome)
    }

    async fn process(&self) -> Result<FeedOutput, FeedFailure> {
        let raw = self.transport.fetch(&self.feed.url).await?;
        let doc = source::rss::parse(&raw)?;
        let feed_title = strip_markup(&doc.title);

        let Filtered { retained, rejected } = filter::filter(doc.entries, self.cutoff_ts);
        let mut items = Vec::with_capacity(retained.len());
        for dated in retained {
            let entry = normalize(dated);
            let translation = match &self.translation {
                Some(adapter) => Some(adapter.translate(&entry).await),
                None => None,
            };
            items.push(item::assemble(&feed_title, entry, translation, self.now));
        }

        Ok(FeedOutput {
            items,
            malformed: rejected.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
