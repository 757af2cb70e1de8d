//! Robots.txt exclusion handling
//!
//! Each host's exclusion policy is fetched at most once per crawl run and
//! cached for the rest of the run. URLs a policy disallows are dropped from
//! the frontier without ever being fetched.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Per-run robots.txt cache, keyed by host
///
/// Owned by the crawl run loop, so no interior locking is needed; the cache
/// is discarded when the run ends.
pub struct RobotsCache {
    user_agent: String,
    by_host: HashMap<String, ParsedRobots>,
}

impl RobotsCache {
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            by_host: HashMap::new(),
        }
    }

    /// Returns true when the host of `url` already has a cached policy
    pub fn has_policy(&self, host: &str) -> bool {
        self.by_host.contains_key(host)
    }

    /// Fetches and caches the policy for the host of `url`
    ///
    /// The fetch is itself a request to the host; callers stamp the
    /// politeness throttle before calling. A robots.txt that cannot be
    /// fetched (connection error or any non-2xx response) degrades to
    /// allow-all for that host.
    pub async fn load_policy(&mut self, client: &Client, url: &Url) {
        let Some(host) = host_key(url) else {
            return;
        };

        if !self.by_host.contains_key(&host) {
            let robots = fetch_robots(client, url).await;
            self.by_host.insert(host, robots);
        }
    }

    /// Checks `url` against its host's cached policy
    ///
    /// A host whose policy was never loaded is treated as allow-all; a URL
    /// without a host is never fetched.
    pub fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = host_key(url) else {
            return false;
        };

        self.by_host
            .get(&host)
            .map(|robots| robots.is_allowed(url.as_str(), &self.user_agent))
            .unwrap_or(true)
    }

    /// Number of hosts with a cached policy (for run diagnostics)
    pub fn cached_hosts(&self) -> usize {
        self.by_host.len()
    }
}

/// Cache key: host plus explicit port, so two servers on one host do not
/// share a policy
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}

/// Fetches robots.txt for the host of `url`
async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    match client.get(robots_url.as_str()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                debug!(url = %robots_url, "Fetched robots.txt");
                ParsedRobots::from_content(&body)
            }
            Err(_) => ParsedRobots::allow_all(),
        },
        Ok(response) => {
            debug!(url = %robots_url, status = %response.status(), "No robots.txt, allowing all");
            ParsedRobots::allow_all()
        }
        Err(e) => {
            debug!(url = %robots_url, error = %e, "robots.txt fetch failed, allowing all");
            ParsedRobots::allow_all()
        }
    }
}
