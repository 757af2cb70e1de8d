//! Export stage
//!
//! Appends every item that passed validation to a JSONL snapshot stream,
//! one JSON object per line. This is an independent side effect: it runs
//! whether Persist inserted, deduplicated, or failed, and its own failures
//! are logged and swallowed.

use crate::config::ExportConfig;
use crate::item::NewsItem;
use crate::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

/// Append-only JSONL writer
pub struct ExportStage {
    file: Mutex<File>,
    path: String,
}

impl ExportStage {
    /// Opens (or creates) the export file in append mode
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            file: Mutex::new(file),
            path: config.path.clone(),
        })
    }

    /// Appends one item as a JSON line
    ///
    /// Serialization or write failures never propagate; the Persist outcome
    /// and the run's continuation are unaffected.
    pub fn append(&self, item: &NewsItem) {
        let line = match serde_json::to_string(item) {
            Ok(line) => line,
            Err(e) => {
                warn!(url = ?item.url, error = %e, "Failed to serialize item for export");
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = writeln!(file, "{}", line) {
            warn!(path = %self.path, error = %e, "Failed to append to export stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(url: &str) -> NewsItem {
        let mut item = NewsItem::new("hackernews");
        item.title = Some("A headline".to_string());
        item.url = Some(url.to_string());
        item
    }

    #[test]
    fn test_appends_one_line_per_item() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.jsonl");
        let stage = ExportStage::new(&ExportConfig {
            path: path.to_string_lossy().to_string(),
        })
        .unwrap();

        stage.append(&item("https://s/1"));
        stage.append(&item("https://s/2"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["url"], "https://s/1");
        assert_eq!(parsed["title"], "A headline");
        assert_eq!(parsed["source"], "hackernews");
    }

    #[test]
    fn test_reopening_appends_rather_than_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.jsonl");
        let config = ExportConfig {
            path: path.to_string_lossy().to_string(),
        };

        ExportStage::new(&config).unwrap().append(&item("https://s/1"));
        ExportStage::new(&config).unwrap().append(&item("https://s/2"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
