//! A fetched page between classification and extraction.

use super::models::SearchQuery;
use super::status::PageStatus;

/// One fetched and classified page.
///
/// Owned by the retry engine for the duration of a page attempt; the raw
/// content is dropped after extraction unless HTML retention is enabled.
#[derive(Debug, Clone)]
pub struct SearchResultPage {
    /// The query that was sent.
    pub query: SearchQuery,
    /// Classifier verdict.
    pub status: PageStatus,
    /// HTTP status code of the response.
    pub http_status: u16,
    /// Response body.
    pub raw_content: Option<String>,
    /// Where the page was stored, if a snapshot was taken.
    pub snapshot_url: Option<String>,
}

impl SearchResultPage {
    /// Creates a page from a response body.
    #[must_use]
    pub fn new(query: SearchQuery, status: PageStatus, http_status: u16, body: String) -> Self {
        Self {
            query,
            status,
            http_status,
            raw_content: Some(body),
            snapshot_url: None,
        }
    }

    /// Whether the page may be handed to the extractor.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == PageStatus::Ok
    }

    /// The body, or an empty string once released.
    #[must_use]
    pub fn content(&self) -> &str {
        self.raw_content.as_deref().unwrap_or("")
    }

    /// Drops the body and returns it.
    pub fn take_content(&mut self) -> Option<String> {
        self.raw_content.take()
    }
}
