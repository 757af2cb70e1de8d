//! Periodic job scheduler
//!
//! Holds a fixed table of named jobs built from configuration: one crawl job
//! per configured source and a retention sweep. Each job ticks on its own
//! period; a tick that arrives while the previous invocation of the same job
//! is still running is skipped and logged, never queued. The per-job guard
//! is the only mutable state shared across runs, and it is checked-and-set
//! atomically.
//!
//! The scheduler treats every job as an opaque unit of work; it knows
//! nothing about crawl internals beyond start and finish.

use crate::adapters;
use crate::config::Config;
use crate::engine::{build_http_client, CrawlEngine};
use crate::pipeline::ItemPipeline;
use crate::storage::ArticleStore;
use crate::{ConfigError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Atomic at-most-one-run guard for a named job
#[derive(Default)]
pub struct OverlapGuard {
    running: Arc<AtomicBool>,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the job running, unless it already is
    ///
    /// The returned token releases the guard when dropped, so the guard is
    /// released however the job finishes.
    pub fn try_acquire(&self) -> Option<RunToken> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(RunToken {
                running: Arc::clone(&self.running),
            })
        } else {
            None
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Held for the duration of one job invocation
pub struct RunToken {
    running: Arc<AtomicBool>,
}

impl Drop for RunToken {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// What a job does when its tick fires
enum JobKind {
    Crawl { engine: Arc<CrawlEngine> },
    Retention { horizon_days: u32 },
}

/// One named entry in the trigger table
struct Job {
    name: String,
    period: Duration,
    kind: JobKind,
    guard: Arc<OverlapGuard>,
}

/// The process-wide trigger table
pub struct Scheduler {
    jobs: Vec<Arc<Job>>,
    store: Arc<Mutex<dyn ArticleStore>>,
}

impl Scheduler {
    /// Builds the job table from configuration
    ///
    /// An unknown adapter name is a configuration error and fails here, at
    /// startup, before the scheduler ever starts ticking.
    pub fn from_config(
        config: &Config,
        store: Arc<Mutex<dyn ArticleStore>>,
        pipeline: Arc<ItemPipeline>,
    ) -> Result<Self> {
        let user_agent = config.user_agent.header_value();
        let client = build_http_client(&user_agent, config.crawler.fetch_timeout_secs)?;

        let mut jobs = Vec::with_capacity(config.jobs.len());
        for entry in &config.jobs {
            let kind = match (&entry.source, entry.retention_days) {
                (Some(source), None) => {
                    let adapter = adapters::build(source)
                        .ok_or_else(|| ConfigError::UnknownAdapter(source.clone()))?;
                    let engine = Arc::new(CrawlEngine::new(
                        adapter,
                        Arc::clone(&pipeline),
                        client.clone(),
                        config.crawler.clone(),
                        user_agent.clone(),
                    ));
                    JobKind::Crawl { engine }
                }
                (None, Some(horizon_days)) => JobKind::Retention { horizon_days },
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "job '{}' must set exactly one of source or retention_days",
                        entry.name
                    ))
                    .into())
                }
            };

            jobs.push(Arc::new(Job {
                name: entry.name.clone(),
                period: Duration::from_secs(entry.period_secs),
                kind,
                guard: Arc::new(OverlapGuard::new()),
            }));
        }

        Ok(Self { jobs, store })
    }

    /// Names in the trigger table, in configuration order
    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.name.as_str()).collect()
    }

    /// Ticks all jobs until `shutdown` turns true
    ///
    /// Each job runs its own interval loop; the first tick fires
    /// immediately. On shutdown, running crawls observe the same signal as
    /// their cancellation source and drain their in-flight fetches.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        info!(jobs = self.jobs.len(), "Scheduler starting");

        let mut loops = JoinSet::new();
        for job in &self.jobs {
            let job = Arc::clone(job);
            let store = Arc::clone(&self.store);
            let mut shutdown = shutdown.clone();

            loops.spawn(async move {
                let mut ticker = tokio::time::interval(job.period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                let mut runs: JoinSet<()> = JoinSet::new();
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            // Each tick runs as its own task so the next
                            // tick fires on time and hits the guard instead
                            // of queueing behind a long invocation.
                            let job = Arc::clone(&job);
                            let store = Arc::clone(&store);
                            let cancel = shutdown.clone();
                            runs.spawn(async move {
                                trigger_job(&job, &store, cancel).await;
                            });
                        }
                        Some(_) = runs.join_next(), if !runs.is_empty() => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                break;
                            }
                        }
                    }
                }

                // Running invocations observe the shutdown signal as their
                // cancellation source; wait for them to drain.
                while runs.join_next().await.is_some() {}
                info!(job = %job.name, "Job loop stopped");
            });
        }

        while loops.join_next().await.is_some() {}
        info!("Scheduler stopped");
    }
}

/// Fires one tick of one job, honoring the overlap guard
async fn trigger_job(
    job: &Job,
    store: &Arc<Mutex<dyn ArticleStore>>,
    cancel: watch::Receiver<bool>,
) {
    let Some(_token) = job.guard.try_acquire() else {
        info!(job = %job.name, "Previous invocation still running, tick skipped");
        return;
    };

    match &job.kind {
        JobKind::Crawl { engine } => {
            engine.run(cancel).await;
        }
        JobKind::Retention { horizon_days } => {
            run_retention_sweep(store, *horizon_days);
        }
    }
}

/// Deletes all rows strictly older than the retention horizon
///
/// Rows at exactly the horizon boundary are kept.
pub fn run_retention_sweep(store: &Arc<Mutex<dyn ArticleStore>>, horizon_days: u32) -> u64 {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(horizon_days));

    let mut store = match store.lock() {
        Ok(store) => store,
        Err(poisoned) => poisoned.into_inner(),
    };

    match store.delete_older_than(cutoff) {
        Ok(removed) => {
            info!(removed, horizon_days, "Retention sweep finished");
            removed
        }
        Err(e) => {
            error!(error = %e, "Retention sweep failed");
            0
        }
    }
}

/// Warns about config surface the scheduler depends on at startup
pub fn log_job_table(config: &Config) {
    if config.jobs.is_empty() {
        warn!("Job table is empty; serve mode will idle");
    }
    for job in &config.jobs {
        match (&job.source, job.retention_days) {
            (Some(source), _) => {
                info!(job = %job.name, source = %source, period_secs = job.period_secs, "Crawl job registered");
            }
            (_, Some(days)) => {
                info!(job = %job.name, retention_days = days, period_secs = job.period_secs, "Retention job registered");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewsItem;
    use crate::storage::SqliteStore;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_overlap_guard_single_acquisition() {
        let guard = OverlapGuard::new();

        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.is_running());

        // Second trigger while the first is running is refused
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_trigger_skipped_run_count_unchanged() {
        let guard = Arc::new(OverlapGuard::new());
        let runs = Arc::new(AtomicU64::new(0));
        let (release_tx, release_rx) = watch::channel(false);

        // First invocation holds the guard until released
        let first = {
            let guard = Arc::clone(&guard);
            let runs = Arc::clone(&runs);
            let mut release = release_rx.clone();
            tokio::spawn(async move {
                let _token = guard.try_acquire().unwrap();
                runs.fetch_add(1, Ordering::SeqCst);
                let _ = release.changed().await;
            })
        };

        // Give the first invocation time to take the guard
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A tick arriving mid-run is skipped
        if let Some(_token) = guard.try_acquire() {
            runs.fetch_add(1, Ordering::SeqCst);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        release_tx.send(true).unwrap();
        first.await.unwrap();

        // After the first run finishes, the next tick runs normally
        if let Some(_token) = guard.try_acquire() {
            runs.fetch_add(1, Ordering::SeqCst);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_retention_sweep_boundary() {
        let store: Arc<Mutex<dyn ArticleStore>> =
            Arc::new(Mutex::new(SqliteStore::open_in_memory().unwrap()));

        let now = Utc::now();
        {
            let mut locked = store.lock().unwrap();
            for (path, age_days) in [("day29", 29i64), ("day31", 31)] {
                let mut item = NewsItem::new("hackernews");
                item.title = Some(path.to_string());
                item.url = Some(format!("https://s/{}", path));
                item.scraped_at = now - chrono::Duration::days(age_days);
                locked.insert_if_absent(&item).unwrap();
            }
        }

        let removed = run_retention_sweep(&store, 30);
        assert_eq!(removed, 1);

        let remaining = store.lock().unwrap().list_articles(None, 10, 0).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://s/day29");
    }

    fn scheduler_config(jobs: Vec<crate::config::JobEntry>) -> Config {
        use crate::config::{StoreConfig, UserAgentConfig};
        Config {
            crawler: Default::default(),
            user_agent: UserAgentConfig {
                crawler_name: "newswell-test".to_string(),
                crawler_version: "0.1".to_string(),
                contact_url: "https://example.com/bot".to_string(),
            },
            store: StoreConfig {
                database_path: ":memory:".to_string(),
            },
            export: None,
            jobs,
        }
    }

    #[test]
    fn test_from_config_rejects_unknown_adapter() {
        let store: Arc<Mutex<dyn ArticleStore>> =
            Arc::new(Mutex::new(SqliteStore::open_in_memory().unwrap()));
        let pipeline = Arc::new(ItemPipeline::new(Arc::clone(&store), None).unwrap());

        let config = scheduler_config(vec![crate::config::JobEntry {
            name: "bad".to_string(),
            period_secs: 60,
            source: Some("no-such-source".to_string()),
            retention_days: None,
        }]);

        assert!(Scheduler::from_config(&config, store, pipeline).is_err());
    }

    #[tokio::test]
    async fn test_scheduler_runs_retention_on_first_tick_and_stops() {
        let store: Arc<Mutex<dyn ArticleStore>> =
            Arc::new(Mutex::new(SqliteStore::open_in_memory().unwrap()));
        {
            let mut locked = store.lock().unwrap();
            let mut stale = NewsItem::new("hackernews");
            stale.title = Some("old".to_string());
            stale.url = Some("https://s/old".to_string());
            stale.scraped_at = Utc::now() - chrono::Duration::days(40);
            locked.insert_if_absent(&stale).unwrap();
        }

        let pipeline = Arc::new(ItemPipeline::new(Arc::clone(&store), None).unwrap());
        let config = scheduler_config(vec![crate::config::JobEntry {
            name: "cleanup".to_string(),
            period_secs: 3600,
            source: None,
            retention_days: Some(30),
        }]);

        let scheduler = Scheduler::from_config(&config, Arc::clone(&store), pipeline).unwrap();
        assert_eq!(scheduler.job_names(), vec!["cleanup"]);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        // The first tick fires immediately; give it a moment, then stop
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(store.lock().unwrap().count_articles().unwrap(), 0);
    }
}
