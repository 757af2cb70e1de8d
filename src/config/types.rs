//! Configuration type definitions

use serde::Deserialize;

/// Main configuration structure for Newswell
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Crawl engine limits
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// User agent identification
    pub user_agent: UserAgentConfig,

    /// Persistence target
    pub store: StoreConfig,

    /// Optional JSONL export stream
    #[serde(default)]
    pub export: Option<ExportConfig>,

    /// Periodic job table for --serve mode
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobEntry>,
}

/// Limits applied to every crawl run
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum requests in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Minimum spacing between consecutive requests to the same host, in
    /// milliseconds
    #[serde(default = "default_per_host_delay")]
    pub per_host_delay_ms: u64,

    /// Maximum pages fetched in one run; guards against unbounded
    /// pagination loops
    #[serde(default = "default_max_pages")]
    pub max_pages_per_run: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Retries for transient fetch failures before the URL is dropped
    #[serde(default = "default_fetch_retries")]
    pub max_fetch_retries: u32,
}

fn default_max_concurrent() -> u32 {
    16
}

fn default_per_host_delay() -> u64 {
    1000
}

fn default_max_pages() -> u32 {
    50
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_fetch_retries() -> u32 {
    3
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            per_host_delay_ms: default_per_host_delay(),
            max_pages_per_run: default_max_pages(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_fetch_retries: default_fetch_retries(),
        }
    }
}

/// Identification sent with every request and matched against robots.txt
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Crawler name (alphanumeric and hyphens)
    pub crawler_name: String,

    /// Crawler version string
    pub crawler_version: String,

    /// URL where site operators can learn about this crawler
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

/// JSONL export stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Path to the append-only JSONL file
    pub path: String,
}

/// One entry in the periodic job table
///
/// Exactly one of `source` and `retention_days` must be set: a crawl job
/// targets a registered adapter, a retention job sweeps the store.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    /// Job name; the overlap guard is keyed on this
    pub name: String,

    /// Seconds between invocations
    pub period_secs: u64,

    /// Adapter to crawl (crawl jobs only)
    #[serde(default)]
    pub source: Option<String>,

    /// Retention horizon in days (retention jobs only)
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl JobEntry {
    /// Returns true if this entry is a retention sweep
    pub fn is_retention(&self) -> bool {
        self.retention_days.is_some()
    }
}
