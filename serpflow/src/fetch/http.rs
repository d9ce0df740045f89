//! `reqwest`-backed [`Fetcher`].

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use super::config::FetchConfig;
use super::protocols::{FetchRequest, FetchResponse, Fetcher};
use crate::errors::{ConfigurationError, SerpError};

/// Fetches pages over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds the underlying client.
    pub fn new(config: &FetchConfig) -> Result<Self, SerpError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ConfigurationError::Invalid(format!("proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigurationError::Invalid(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SerpError> {
        let started = Instant::now();
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SerpError::transport(&request.url, e.to_string()))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| SerpError::transport(&request.url, e.to_string()))?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(url = %request.url, status, duration_ms, "Fetched page");

        Ok(FetchResponse {
            status,
            body,
            final_url,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_client() {
        assert!(ReqwestFetcher::new(&FetchConfig::default()).is_ok());
        let proxied = FetchConfig::default().with_proxy("http://127.0.0.1:8080");
        assert!(ReqwestFetcher::new(&proxied).is_ok());
    }

    #[test]
    fn test_bad_proxy_rejected() {
        let config = FetchConfig::default().with_proxy("::not a url::");
        let err = ReqwestFetcher::new(&config).unwrap_err();
        assert!(matches!(err, SerpError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let fetcher = ReqwestFetcher::new(&FetchConfig::default().with_timeout(2.0)).unwrap();
        let err = fetcher
            .fetch(&FetchRequest::new("http://127.0.0.1:1/search?q=x"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
