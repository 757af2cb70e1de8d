//! Validate stage
//!
//! The single drop point for items with missing required fields. Adapters
//! deliberately emit partial items when selectors miss; this stage decides
//! whether they survive. A drop is silent apart from a debug log: it is
//! routine (a markup change at the source), not an error.

use crate::item::NewsItem;
use tracing::debug;

/// Drops items missing `title`, `url`, or `source`
pub struct ValidateStage;

impl ValidateStage {
    /// Returns true if the item may continue to Persist
    pub fn check(&self, item: &NewsItem) -> bool {
        if item.has_required_fields() {
            return true;
        }

        debug!(
            source = %item.source,
            url = ?item.url,
            has_title = item.title.is_some(),
            "Dropping item with missing required fields"
        );
        false
    }
}
