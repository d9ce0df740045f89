//! Error types for serpflow.
//!
//! The taxonomy follows how a failure is handled by the scraping pipeline:
//!
//! - [`SerpError::Transport`] is fatal for a page and never retried.
//! - [`SerpError::SoftBlock`] is retried until the retry budget is spent.
//! - [`ExtractionInconsistency`] is logged; the page is still emitted.
//! - [`ConfigurationError`] is raised before any request is sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used across the crate.
pub type SerpResult<T> = Result<T, SerpError>;

/// The main error type for serpflow operations.
#[derive(Debug, Error)]
pub enum SerpError {
    /// Invalid input parameters or settings.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The request failed below the HTTP layer (DNS, TLS, timeout, reset).
    #[error("Transport failure for {url}: {message}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// The underlying error message.
        message: String,
    },

    /// The page stayed soft-blocked after every retry.
    #[error("Soft block on {url} persisted after {attempts} attempts ({signal})")]
    SoftBlock {
        /// The URL being fetched.
        url: String,
        /// Number of fetch attempts made.
        attempts: u32,
        /// The last signal that fired.
        signal: String,
    },

    /// The page was judged healthy but a required region was missing.
    #[error("{0}")]
    ExtractionInconsistency(#[from] ExtractionInconsistency),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerpError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether the error aborts a page without retrying.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Configuration(_))
    }
}

/// Invalid input rejected before any fetch happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A required text field was empty or whitespace.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Page numbers start at 1.
    #[error("page must be >= 1, got {0}")]
    InvalidPage(u32),

    /// The page lies past the last page Bing serves for the page size.
    #[error("page {page} is beyond the last servable page {ceiling}")]
    PageBeyondCeiling {
        /// The requested page.
        page: u32,
        /// Highest page allowed at this page size.
        ceiling: u32,
    },

    /// A URL input could not be used as a search request.
    #[error("invalid search URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Both `maxPages` and `maxResults` were supplied.
    #[error("input '{0}' sets both maxPages and maxResults")]
    ConflictingLimits(String),

    /// Neither a term nor a URL was supplied.
    #[error("input #{0} has neither a term nor a url")]
    MissingTerm(usize),

    /// A settings value is out of range or malformed.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// An `Ok` page whose organic results container could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Extraction inconsistency on {url}: {reason}")]
pub struct ExtractionInconsistency {
    /// The page URL.
    pub url: String,
    /// What was missing.
    pub reason: String,
}

impl ExtractionInconsistency {
    /// Creates a new inconsistency report.
    #[must_use]
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_fatal() {
        let err = SerpError::transport("https://www.bing.com/search?q=x", "connection reset");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_soft_block_is_not_fatal() {
        let err = SerpError::SoftBlock {
            url: "u".to_string(),
            attempts: 4,
            signal: "captcha_marker".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("4 attempts"));
    }

    #[test]
    fn test_configuration_error_converts() {
        let err: SerpError = ConfigurationError::Empty { field: "term" }.into();
        assert!(matches!(err, SerpError::Configuration(_)));
        assert_eq!(err.to_string(), "term must not be empty");
    }

    #[test]
    fn test_inconsistency_display() {
        let err = ExtractionInconsistency::new("https://x", "missing #b_results");
        assert_eq!(
            err.to_string(),
            "Extraction inconsistency on https://x: missing #b_results"
        );
    }
}
