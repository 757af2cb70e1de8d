//! Newswell: a periodic news article crawler
//!
//! This crate fetches articles from configured news sources, extracts a
//! normalized record from each page, deduplicates them by URL against a
//! SQLite store, and prunes records older than a retention horizon.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod item;
pub mod pipeline;
pub mod robots;
pub mod scheduler;
pub mod storage;
pub mod url_norm;

use thiserror::Error;

/// Main error type for Newswell operations
#[derive(Debug, Error)]
pub enum NewswellError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// This is the only error class that aborts the process. Everything else is
/// contained within a crawl run and surfaces through the run summary.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown adapter '{0}' in job table")]
    UnknownAdapter(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Newswell operations
pub type Result<T> = std::result::Result<T, NewswellError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use adapters::{FetchedPage, ParseOutput, SiteAdapter};
pub use config::Config;
pub use engine::{CrawlEngine, RunSummary};
pub use item::NewsItem;
pub use pipeline::ItemPipeline;
pub use storage::{ArticleStore, InsertOutcome, SqliteStore};
pub use url_norm::normalize_url;
