//! HTTP fetching with bounded retry
//!
//! One client is built per process and shared by all runs. Transient
//! failures (timeouts, connection errors, 5xx responses) are retried a
//! bounded number of times with backoff; anything else fails the URL
//! immediately. A failed URL is dropped and counted, never fatal to a run.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Result of fetching one frontier entry
#[derive(Debug)]
pub enum FetchOutcome {
    /// Page fetched; `final_url` reflects any redirects followed
    Success { final_url: Url, body: String },

    /// All attempts exhausted or a non-retryable error occurred
    Failed { error: String },
}

/// Builds the shared HTTP client
///
/// # Arguments
///
/// * `user_agent` - Full user agent header value
/// * `timeout_secs` - Per-request timeout; every fetch has a bounded wait
pub fn build_http_client(user_agent: &str, timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, retrying transient failures up to `max_retries` times
///
/// Retryable: request timeout, connection error, HTTP 5xx, HTTP 429.
/// Non-retryable: any other non-success status, or a body read error.
/// Backoff grows linearly from `retry_backoff`. Callers derive that floor
/// from the per-host politeness delay: a retry is another request to the
/// same host and must keep the configured spacing.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    max_retries: u32,
    retry_backoff: Duration,
) -> FetchOutcome {
    let mut last_error = String::new();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = retry_backoff * attempt;
            debug!(%url, attempt, ?backoff, "Retrying fetch");
            tokio::time::sleep(backoff).await;
        }

        match client.get(url.as_str()).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let final_url = response.url().clone();
                    match response.text().await {
                        Ok(body) => return FetchOutcome::Success { final_url, body },
                        Err(e) => {
                            return FetchOutcome::Failed {
                                error: format!("body read failed: {}", e),
                            }
                        }
                    }
                }

                if status.is_server_error() || status.as_u16() == 429 {
                    last_error = format!("HTTP {}", status);
                    continue;
                }

                return FetchOutcome::Failed {
                    error: format!("HTTP {}", status),
                };
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_error = e.to_string();
                continue;
            }
            Err(e) => {
                return FetchOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }
    }

    warn!(%url, retries = max_retries, error = %last_error, "Dropping URL after retries");
    FetchOutcome::Failed { error: last_error }
}
