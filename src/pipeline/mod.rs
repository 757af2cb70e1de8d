//! The item pipeline: Validate → Persist → Export
//!
//! Every item an adapter yields flows once through these three stages, in
//! this order. The order is a design invariant, fixed by construction (the
//! stages are named fields, not a configurable table): an item must be
//! validated before it can be persisted, and the export stream observes
//! items whether or not Persist kept them.
//!
//! Items are processed independently; a drop or failure on one item has no
//! effect on any other item, in the same run or another.

mod export;
mod persist;
mod validate;

pub use export::ExportStage;
pub use persist::{PersistOutcome, PersistStage};
pub use validate::ValidateStage;

use crate::config::ExportConfig;
use crate::item::NewsItem;
use crate::storage::ArticleStore;
use crate::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// How the pipeline disposed of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDisposition {
    /// Dropped at Validate: a required field was absent
    DroppedInvalid,
    /// Stored as a new article
    Persisted,
    /// URL already present; recognized and dropped, not an error
    Duplicate,
    /// Transient store failure; logged and counted, the run continues
    StoreUnavailable,
}

/// The fixed three-stage pipeline, assembled once at startup
pub struct ItemPipeline {
    validate: ValidateStage,
    persist: PersistStage,
    export: Option<ExportStage>,
}

impl ItemPipeline {
    /// Builds the pipeline over a shared store handle
    ///
    /// # Arguments
    ///
    /// * `store` - Shared store handle, constructed once at process start
    /// * `export` - Optional JSONL export stream configuration
    pub fn new(
        store: Arc<Mutex<dyn ArticleStore>>,
        export: Option<&ExportConfig>,
    ) -> Result<Self> {
        let export = export.map(ExportStage::new).transpose()?;

        Ok(Self {
            validate: ValidateStage,
            persist: PersistStage::new(store),
            export,
        })
    }

    /// Runs one item through all stages
    ///
    /// Validate short-circuits the remaining stages. Export runs regardless
    /// of the Persist outcome and its failure never affects the result.
    pub fn process(&self, item: NewsItem) -> ItemDisposition {
        if !self.validate.check(&item) {
            return ItemDisposition::DroppedInvalid;
        }

        let disposition = match self.persist.persist(&item) {
            PersistOutcome::Inserted => ItemDisposition::Persisted,
            PersistOutcome::Duplicate => ItemDisposition::Duplicate,
            PersistOutcome::Unavailable => ItemDisposition::StoreUnavailable,
        };

        if let Some(export) = &self.export {
            export.append(&item);
        }

        debug!(url = ?item.url, ?disposition, "Processed item");
        disposition
    }
}
