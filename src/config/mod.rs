//! Configuration loading and validation
//!
//! Newswell is configured through a single TOML file covering crawl limits,
//! user agent identification, the store target, the optional export stream,
//! and the periodic job table.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, CrawlerConfig, ExportConfig, JobEntry, StoreConfig, UserAgentConfig,
};
pub use validation::validate;
