//! The normalized article record flowing through the pipeline

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single extracted article
///
/// `title` and `url` are optional here because adapters fill in whatever
/// their selectors find; the Validate stage is the single drop point for
/// missing required fields. `url` is the sole identity key across the store:
/// two items with the same URL are the same logical article.
#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    /// Article headline
    pub title: Option<String>,

    /// Canonical article URL (unique key in the store)
    pub url: Option<String>,

    /// Article body text, when the source exposes it
    pub content: Option<String>,

    /// Byline, when the source exposes it
    pub author: Option<String>,

    /// Source-provided publication date, stored verbatim (never parsed)
    pub published_date: Option<String>,

    /// Name of the adapter that produced this item
    pub source: String,

    /// Extraction timestamp; set once at creation, used for ordering and
    /// retention
    pub scraped_at: DateTime<Utc>,
}

impl NewsItem {
    /// Creates an empty item for the given source, stamped with the current
    /// time
    pub fn new(source: &str) -> Self {
        Self {
            title: None,
            url: None,
            content: None,
            author: None,
            published_date: None,
            source: source.to_string(),
            scraped_at: Utc::now(),
        }
    }

    /// Returns true if all fields required by the Validate stage are present
    pub fn has_required_fields(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
            && self.url.as_deref().is_some_and(|u| !u.is_empty())
            && !self.source.is_empty()
    }
}
