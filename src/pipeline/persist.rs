//! Persist stage
//!
//! Attempts an insert-if-absent against the store. Each item is its own
//! transaction; a duplicate URL is a counted, routine outcome, and a
//! transient store failure loses that one item but nothing else.

use crate::item::NewsItem;
use crate::storage::{ArticleStore, InsertOutcome};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Outcome of the Persist stage for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted,
    Duplicate,
    Unavailable,
}

/// Writes items through the shared store handle
pub struct PersistStage {
    store: Arc<Mutex<dyn ArticleStore>>,
}

impl PersistStage {
    pub fn new(store: Arc<Mutex<dyn ArticleStore>>) -> Self {
        Self { store }
    }

    /// Inserts the item unless its URL is already present
    pub fn persist(&self, item: &NewsItem) -> PersistOutcome {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => {
                // A panic while holding the lock left the mutex poisoned;
                // the store itself is still consistent (per-item
                // transactions), so keep going.
                poisoned.into_inner()
            }
        };

        match store.insert_if_absent(item) {
            Ok(InsertOutcome::Inserted) => PersistOutcome::Inserted,
            Ok(InsertOutcome::Duplicate) => PersistOutcome::Duplicate,
            Err(e) => {
                warn!(url = ?item.url, error = %e, "Store unavailable, item discarded");
                PersistOutcome::Unavailable
            }
        }
    }
}
