//! Request variants for first attempts and retries.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::SearchQuery;
use crate::fetch::FetchRequest;
use crate::query::base_headers;

/// Desktop browsers rotated across first attempts.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36",
];

/// Chrome major versions used for retry User-Agents.
pub const RETRY_CHROME_VERSIONS: std::ops::RangeInclusive<u32> = 110..=125;

fn with_base_headers(query: &SearchQuery) -> FetchRequest {
    base_headers(query)
        .into_iter()
        .fold(FetchRequest::new(query.url()), |req, (name, value)| {
            req.with_header(name, value)
        })
}

/// Request for the first fetch of a page.
#[must_use]
pub fn initial_request(query: &SearchQuery) -> FetchRequest {
    let agent = DEFAULT_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_USER_AGENTS[0]);
    with_base_headers(query).with_header("User-Agent", agent)
}

/// Request for a retry after a soft block.
///
/// Asks intermediaries not to serve a cached interstitial, and when
/// `rotate_user_agent` is set presents a freshly versioned browser.
#[must_use]
pub fn retry_request(query: &SearchQuery, rotate_user_agent: bool) -> FetchRequest {
    let agent = if rotate_user_agent {
        let major = rand::thread_rng().gen_range(RETRY_CHROME_VERSIONS);
        format!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0 Safari/537.36"
        )
    } else {
        DEFAULT_USER_AGENTS[0].to_string()
    };
    with_base_headers(query)
        .with_header("User-Agent", agent)
        .with_header("Cache-Control", "no-cache")
        .with_header("Pragma", "no-cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryBuilder, QueryParams};

    fn query() -> SearchQuery {
        QueryBuilder::new()
            .build(&QueryParams::new("apify", "en-US", "en", 10))
            .unwrap()
    }

    #[test]
    fn test_initial_request() {
        let request = initial_request(&query());
        assert_eq!(request.url, query().url());
        assert!(DEFAULT_USER_AGENTS.contains(&request.header("User-Agent").unwrap()));
        assert_eq!(request.header("Accept-Language"), Some("en"));
        assert!(request.header("Cache-Control").is_none());
    }

    #[test]
    fn test_retry_request_is_mutated() {
        for _ in 0..10 {
            let request = retry_request(&query(), true);
            assert_eq!(request.header("Cache-Control"), Some("no-cache"));

            let agent = request.header("User-Agent").unwrap();
            let major: u32 = agent
                .split("Chrome/")
                .nth(1)
                .and_then(|rest| rest.split('.').next())
                .and_then(|v| v.parse().ok())
                .unwrap();
            assert!(RETRY_CHROME_VERSIONS.contains(&major));
        }
    }

    #[test]
    fn test_retry_request_without_rotation() {
        let request = retry_request(&query(), false);
        assert_eq!(request.header("User-Agent"), Some(DEFAULT_USER_AGENTS[0]));
        assert_eq!(request.header("Pragma"), Some("no-cache"));
    }
}
