//! Crawl engine
//!
//! One `CrawlEngine` run drives a single source: it seeds the frontier from
//! the adapter's start URLs, fans fetches out to a bounded worker pool, hands
//! each fetched page to the adapter, streams yielded items through the item
//! pipeline, and feeds yielded follow-up links back into the frontier. The
//! run ends when the frontier drains or cancellation is observed; in-flight
//! fetches are allowed to finish either way.

mod fetcher;
mod frontier;

pub use fetcher::{build_http_client, fetch_with_retry, FetchOutcome};
pub use frontier::{Frontier, HostThrottle};

use crate::adapters::{FetchedPage, SiteAdapter};
use crate::config::CrawlerConfig;
use crate::pipeline::{ItemDisposition, ItemPipeline};
use crate::robots::{host_key, RobotsCache};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use url::Url;

/// Counts reported by a finished crawl run
///
/// These are the sole observable failure signal during normal operation;
/// per-URL and per-item failures never terminate a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: u64,
    pub items_produced: u64,
    pub items_persisted: u64,
    pub duplicates: u64,
    pub parse_drops: u64,
    pub store_errors: u64,
    pub fetch_failures: u64,
    pub robots_denied: u64,
}

/// Per-page tallies carried back from a worker
#[derive(Debug, Default)]
struct PageCounts {
    produced: u64,
    persisted: u64,
    duplicates: u64,
    parse_drops: u64,
    store_errors: u64,
}

/// What one worker did with one frontier entry
enum WorkerOutcome {
    Fetched {
        follow: Vec<Url>,
        counts: PageCounts,
    },
    FetchFailed,
}

/// Drives crawl runs for one source
pub struct CrawlEngine {
    adapter: Arc<dyn SiteAdapter>,
    pipeline: Arc<ItemPipeline>,
    client: Client,
    config: CrawlerConfig,
    user_agent: String,
}

impl CrawlEngine {
    /// Creates an engine for one adapter
    ///
    /// # Arguments
    ///
    /// * `adapter` - The source's parsing logic
    /// * `pipeline` - The shared item pipeline
    /// * `client` - The process-wide HTTP client
    /// * `config` - Crawl limits
    /// * `user_agent` - Agent string matched against robots.txt
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        pipeline: Arc<ItemPipeline>,
        client: Client,
        config: CrawlerConfig,
        user_agent: String,
    ) -> Self {
        Self {
            adapter,
            pipeline,
            client,
            config,
            user_agent,
        }
    }

    /// Runs one crawl without an external cancellation source
    pub async fn run_to_completion(&self) -> RunSummary {
        let (_tx, rx) = watch::channel(false);
        self.run(rx).await
    }

    /// Runs one crawl until the frontier drains or `cancel` turns true
    ///
    /// On cancellation no new fetches start, but in-flight fetches complete
    /// and their items are processed; follow-up links discovered after the
    /// signal are discarded.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> RunSummary {
        let source = self.adapter.name();
        info!(source, "Starting crawl run");
        let started = Instant::now();

        let mut frontier = Frontier::new(self.config.max_pages_per_run);
        for url in self.adapter.start_urls() {
            frontier.enqueue(&url);
        }

        let mut throttle =
            HostThrottle::new(Duration::from_millis(self.config.per_host_delay_ms));
        let mut robots = RobotsCache::new(&self.user_agent);
        let semaphore = Arc::new(Semaphore::new(
            self.config.max_concurrent_requests as usize,
        ));
        let mut workers: JoinSet<WorkerOutcome> = JoinSet::new();
        let mut summary = RunSummary::default();
        let mut cancel_closed = false;

        loop {
            let cancelled = *cancel.borrow();

            // Admit at most one entry per iteration so finished workers are
            // drained promptly between spawns.
            if !cancelled {
                if let Some(url) = frontier.pop_ready(&throttle, Instant::now()) {
                    let host = host_key(&url);

                    // The robots.txt fetch is itself a request to the host:
                    // stamp the throttle, load the policy, and put the entry
                    // back so the page fetch waits out the spacing.
                    if let Some(host) = &host {
                        if !robots.has_policy(host) {
                            throttle.record_request(host, Instant::now());
                            robots.load_policy(&self.client, &url).await;
                            frontier.requeue(url);
                            continue;
                        }
                    }

                    if !robots.is_allowed(&url) {
                        debug!(%url, "Disallowed by robots.txt, dropped without fetch");
                        summary.robots_denied += 1;
                        continue;
                    }

                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    // The signal may have arrived while parked on the
                    // semaphore; the popped entry is discarded, not fetched.
                    if *cancel.borrow() {
                        continue;
                    }

                    if let Some(host) = &host {
                        throttle.record_request(host, Instant::now());
                    }

                    let adapter = Arc::clone(&self.adapter);
                    let pipeline = Arc::clone(&self.pipeline);
                    let client = self.client.clone();
                    let retries = self.config.max_fetch_retries;
                    let backoff = retry_backoff(&self.config);
                    workers.spawn(async move {
                        let _permit = permit;
                        crawl_page(&client, adapter.as_ref(), &pipeline, url, retries, backoff)
                            .await
                    });
                    continue;
                }
            }

            if workers.is_empty() && (cancelled || frontier.is_empty()) {
                break;
            }

            let wait = frontier.time_until_ready(&throttle, Instant::now());

            tokio::select! {
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    match joined {
                        Ok(outcome) => {
                            let admit_follow = !*cancel.borrow();
                            apply_outcome(&mut summary, &mut frontier, outcome, admit_follow);
                        }
                        Err(e) => {
                            error!(source, error = %e, "Crawl worker panicked");
                            summary.fetch_failures += 1;
                        }
                    }
                }
                _ = sleep_for(wait), if !cancelled && wait.is_some() => {}
                changed = cancel.changed(), if !cancel_closed => {
                    if changed.is_err() {
                        cancel_closed = true;
                    }
                }
            }
        }

        info!(
            source,
            elapsed = ?started.elapsed(),
            pages_fetched = summary.pages_fetched,
            items_produced = summary.items_produced,
            items_persisted = summary.items_persisted,
            duplicates = summary.duplicates,
            parse_drops = summary.parse_drops,
            store_errors = summary.store_errors,
            fetch_failures = summary.fetch_failures,
            robots_denied = summary.robots_denied,
            "Crawl run finished"
        );

        summary
    }
}

/// Retry spacing for one host: never tighter than the politeness delay
fn retry_backoff(config: &CrawlerConfig) -> Duration {
    Duration::from_millis(config.per_host_delay_ms.max(500))
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn apply_outcome(
    summary: &mut RunSummary,
    frontier: &mut Frontier,
    outcome: WorkerOutcome,
    admit_follow: bool,
) {
    match outcome {
        WorkerOutcome::Fetched { follow, counts } => {
            summary.pages_fetched += 1;
            summary.items_produced += counts.produced;
            summary.items_persisted += counts.persisted;
            summary.duplicates += counts.duplicates;
            summary.parse_drops += counts.parse_drops;
            summary.store_errors += counts.store_errors;

            if admit_follow {
                for url in follow {
                    frontier.enqueue(&url);
                }
            }
        }
        WorkerOutcome::FetchFailed => {
            summary.fetch_failures += 1;
        }
    }
}

/// One worker: fetch a page, parse it, stream its items through the pipeline
async fn crawl_page(
    client: &Client,
    adapter: &dyn SiteAdapter,
    pipeline: &ItemPipeline,
    url: Url,
    retries: u32,
    backoff: Duration,
) -> WorkerOutcome {
    match fetch_with_retry(client, &url, retries, backoff).await {
        FetchOutcome::Success { final_url, body } => {
            let page = FetchedPage {
                url: final_url,
                body,
            };
            let parsed = adapter.parse(&page);

            let mut counts = PageCounts {
                produced: parsed.items.len() as u64,
                ..PageCounts::default()
            };
            for item in parsed.items {
                match pipeline.process(item) {
                    ItemDisposition::Persisted => counts.persisted += 1,
                    ItemDisposition::Duplicate => counts.duplicates += 1,
                    ItemDisposition::DroppedInvalid => counts.parse_drops += 1,
                    ItemDisposition::StoreUnavailable => counts.store_errors += 1,
                }
            }

            WorkerOutcome::Fetched {
                follow: parsed.follow,
                counts,
            }
        }
        FetchOutcome::Failed { error } => {
            debug!(%url, error, "Frontier entry dropped after fetch failure");
            WorkerOutcome::FetchFailed
        }
    }
}
