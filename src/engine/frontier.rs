//! Run-scoped frontier and per-host politeness tracking
//!
//! Both structures live exactly as long as one crawl run and are owned by
//! its run loop; nothing here is persisted or shared between runs.

use crate::robots::host_key;
use crate::url_norm::normalize_url;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use url::Url;

/// Pending URLs for one crawl run, with a visited set and a page budget
///
/// Identity is the normalized URL: the same page reached through different
/// fragments or tracking parameters is admitted once. The budget counts
/// admissions, which bounds pagination chains regardless of how many links
/// each page yields.
pub struct Frontier {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
    admitted: u32,
    max_pages: u32,
}

impl Frontier {
    pub fn new(max_pages: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            admitted: 0,
            max_pages,
        }
    }

    /// Admits a URL unless it was already visited or the budget is spent
    ///
    /// Returns true if the URL was enqueued. The URL is marked visited at
    /// admission, so later duplicates are rejected even before the fetch
    /// happens.
    pub fn enqueue(&mut self, url: &Url) -> bool {
        let Ok(normalized) = normalize_url(url.as_str()) else {
            return false;
        };

        if self.admitted >= self.max_pages {
            return false;
        }

        if !self.visited.insert(normalized.to_string()) {
            return false;
        }

        self.admitted += 1;
        self.queue.push_back(normalized);
        true
    }

    /// Puts an already-admitted URL back at the head of the queue
    ///
    /// Used when popping an entry triggered a side request (the host's
    /// robots.txt fetch) that must be spaced before the page itself is
    /// fetched. The URL stays visited and keeps its spent budget.
    pub fn requeue(&mut self, url: Url) {
        self.queue.push_front(url);
    }

    /// Removes and returns the first queued URL whose host is ready under
    /// the politeness throttle
    pub fn pop_ready(&mut self, throttle: &HostThrottle, now: Instant) -> Option<Url> {
        let position = self
            .queue
            .iter()
            .position(|url| match host_key(url) {
                Some(host) => throttle.time_until_ready(&host, now).is_none(),
                None => true,
            })?;

        self.queue.remove(position)
    }

    /// Shortest wait until any queued URL's host becomes ready
    ///
    /// Returns None when the queue is empty.
    pub fn time_until_ready(&self, throttle: &HostThrottle, now: Instant) -> Option<Duration> {
        self.queue
            .iter()
            .map(|url| {
                host_key(url)
                    .and_then(|host| throttle.time_until_ready(&host, now))
                    .unwrap_or(Duration::ZERO)
            })
            .min()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Per-host request spacing, independent of the global concurrency bound
///
/// Consecutive requests to the same host are separated by at least the
/// configured delay, measured between request starts.
pub struct HostThrottle {
    delay: Duration,
    last_request: HashMap<String, Instant>,
}

impl HostThrottle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: HashMap::new(),
        }
    }

    /// Time remaining before `host` may be requested again, or None if it
    /// is ready now
    pub fn time_until_ready(&self, host: &str, now: Instant) -> Option<Duration> {
        let last = self.last_request.get(host)?;
        let elapsed = now.duration_since(*last);
        if elapsed < self.delay {
            Some(self.delay - elapsed)
        } else {
            None
        }
    }

    /// Records that a request to `host` is starting now
    pub fn record_request(&mut self, host: &str, now: Instant) {
        self.last_request.insert(host.to_string(), now);
    }
}
