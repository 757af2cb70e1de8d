//! URL normalization for visited-set identity
//!
//! The crawl engine treats two URLs with the same scheme, host, path, and
//! query as one identity. Normalization exists so the visited set and the
//! store's URL key agree on what "the same page" means.

use crate::UrlError;
use url::Url;

/// Query parameters that only carry click tracking; stripped so the same
/// article reached through different referrers dedups to one URL
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a URL for frontier and visited-set identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or non-HTTP(S)
/// 2. Lowercase the host
/// 3. Normalize the path (remove dot segments, collapse empty segments,
///    strip the trailing slash except for the root)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters and sort the remainder
///
/// The host is otherwise left alone: `www.` is not folded away, because two
/// hosts that serve different robots.txt files must not share an identity.
///
/// # Examples
///
/// ```
/// use newswell::url_norm::normalize_url;
///
/// let url = normalize_url("https://Example.com/news/page/#frag").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Parse(e.to_string()))?;
            }
        }
        None => return Err(UrlError::MissingHost),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Removes dot segments and the trailing slash (except for root)
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Drops tracking parameters and sorts the rest by key
fn filter_and_sort_query(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}
