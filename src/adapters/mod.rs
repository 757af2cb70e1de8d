//! Per-source page-parsing adapters
//!
//! Each news source gets one adapter implementing [`SiteAdapter`]. An
//! adapter is handed a fetched page and returns whatever it could extract:
//! zero or more items plus zero or more follow-up URLs (pagination links or
//! detail-page links). Adapters never fail on malformed markup; a selector
//! that finds nothing simply leaves the field absent, and the Validate
//! pipeline stage is the single drop point for missing required fields.

mod bbcnews;
mod hackernews;

pub use bbcnews::BbcNewsAdapter;
pub use hackernews::HackerNewsAdapter;

use crate::item::NewsItem;
use std::sync::Arc;
use url::Url;

/// A page the crawl engine fetched, as seen by an adapter
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL of the page (after redirects)
    pub url: Url,

    /// Response body
    pub body: String,
}

/// What an adapter extracted from one page
#[derive(Debug, Default)]
pub struct ParseOutput {
    /// Completed items ready for the pipeline
    pub items: Vec<NewsItem>,

    /// URLs to enqueue on the frontier
    pub follow: Vec<Url>,
}

/// Source-specific parsing logic
///
/// Two shapes are supported, both behind the same contract:
///
/// - single-phase: a listing page directly yields complete items, plus a
///   pagination link to follow (Hacker News);
/// - two-phase: the listing page yields only detail-page links, and a later
///   invocation on each detail page yields the full item (BBC News).
///
/// `parse` dispatches on the page URL, so the engine needs no knowledge of
/// which shape a source uses.
pub trait SiteAdapter: Send + Sync {
    /// Registered source name; items carry it and job tables reference it
    fn name(&self) -> &'static str;

    /// URLs that seed the frontier at the start of a run
    fn start_urls(&self) -> Vec<Url>;

    /// Extracts items and follow-up URLs from a fetched page
    ///
    /// Must not fail: a malformed page returns a best-effort (possibly
    /// empty) result and the engine moves on to the next frontier entry.
    fn parse(&self, page: &FetchedPage) -> ParseOutput;
}

/// Names of all registered adapters
pub const REGISTERED_SOURCES: &[&str] = &[hackernews::NAME, bbcnews::NAME];

/// Returns true if `name` refers to a registered adapter
pub fn is_registered(name: &str) -> bool {
    REGISTERED_SOURCES.contains(&name)
}

/// Looks up an adapter by source name
pub fn build(name: &str) -> Option<Arc<dyn SiteAdapter>> {
    match name {
        hackernews::NAME => Some(Arc::new(HackerNewsAdapter)),
        bbcnews::NAME => Some(Arc::new(BbcNewsAdapter)),
        _ => None,
    }
}
