//! Configuration validation
//!
//! Anything rejected here is a startup-only failure: the process never
//! enters its crawl or serve state with a configuration it cannot honor.

use crate::adapters;
use crate::config::types::{Config, CrawlerConfig, JobEntry, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.store.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "store.database_path cannot be empty".to_string(),
        ));
    }

    validate_jobs(&config.jobs)?;
    Ok(())
}

/// Validates crawl engine limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_pages_per_run < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_run must be >= 1, got {}",
            config.max_pages_per_run
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent identification
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|_| ConfigError::InvalidUrl(config.contact_url.clone()))?;

    Ok(())
}

/// Validates the periodic job table
///
/// Every entry must name exactly one target (a registered adapter or a
/// retention horizon), carry a nonzero period, and have a unique name; the
/// overlap guard is keyed on the name.
fn validate_jobs(jobs: &[JobEntry]) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for job in jobs {
        if job.name.is_empty() {
            return Err(ConfigError::Validation(
                "job name cannot be empty".to_string(),
            ));
        }

        if !seen_names.insert(job.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate job name '{}'",
                job.name
            )));
        }

        if job.period_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "job '{}' must have a nonzero period",
                job.name
            )));
        }

        match (&job.source, job.retention_days) {
            (Some(source), None) => {
                if !adapters::is_registered(source) {
                    return Err(ConfigError::UnknownAdapter(source.clone()));
                }
            }
            (None, Some(days)) => {
                if days == 0 {
                    return Err(ConfigError::Validation(format!(
                        "job '{}' must have a nonzero retention horizon",
                        job.name
                    )));
                }
            }
            _ => {
                return Err(ConfigError::Validation(format!(
                    "job '{}' must set exactly one of source or retention_days",
                    job.name
                )));
            }
        }
    }

    Ok(())
}
