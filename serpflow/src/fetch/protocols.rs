//! The fetch seam.
//!
//! The engine never talks to the network directly; it hands a
//! [`FetchRequest`] to a [`Fetcher`]. Tests script responses through
//! [`MockFetcher`] or the fakes in [`crate::testing`].

use async_trait::async_trait;

use crate::errors::SerpError;

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Creates a request with no headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Sets a header, replacing any existing value (names compare
    /// case-insensitively).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Looks up a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body decoded as text.
    pub body: String,
    /// URL after redirects.
    pub final_url: String,
    /// Wall time of the request in milliseconds.
    pub duration_ms: u64,
}

impl FetchResponse {
    /// A response with the given status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            final_url: String::new(),
            duration_ms: 0,
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs HTTP GETs.
///
/// Implementations return `Ok` for every HTTP response, whatever the status,
/// and `Err(SerpError::Transport)` only when no response was received.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SerpError>;
}
