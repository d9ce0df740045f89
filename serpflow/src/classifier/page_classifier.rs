//! Labels fetched pages as `Ok`, `SoftBlocked` or `Fatal`.

use scraper::Html;
use std::collections::HashSet;

use super::signals::{PageView, SignalSet};
use crate::core::{PageStatus, SearchQuery};

/// Signal name reported for throttling status codes.
pub const THROTTLE_SIGNAL: &str = "http_throttle";

/// Signal name reported for transport failures when they are retried.
pub const TRANSPORT_SIGNAL: &str = "transport_failure";

/// Classifier verdict with the signal that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The label.
    pub status: PageStatus,
    /// Name of the soft-block signal, if one fired.
    pub signal: Option<String>,
}

impl Classification {
    fn ok() -> Self {
        Self {
            status: PageStatus::Ok,
            signal: None,
        }
    }

    fn fatal() -> Self {
        Self {
            status: PageStatus::Fatal,
            signal: None,
        }
    }

    fn soft_blocked(signal: impl Into<String>) -> Self {
        Self {
            status: PageStatus::SoftBlocked,
            signal: Some(signal.into()),
        }
    }
}

fn default_throttle_statuses() -> HashSet<u16> {
    [429, 503].into_iter().collect()
}

/// Heuristic page classifier.
///
/// Order of checks: throttling status, other non-2xx status, then the
/// configured soft-block signals in order.
#[derive(Debug, Clone)]
pub struct PageClassifier {
    signals: SignalSet,
    throttle_statuses: HashSet<u16>,
    retry_transport: bool,
}

impl Default for PageClassifier {
    fn default() -> Self {
        Self::new(SignalSet::default())
    }
}

impl PageClassifier {
    /// Creates a classifier with a signal set.
    #[must_use]
    pub fn new(signals: SignalSet) -> Self {
        Self {
            signals,
            throttle_statuses: default_throttle_statuses(),
            retry_transport: false,
        }
    }

    /// Replaces the statuses treated as throttling (soft blocks).
    #[must_use]
    pub fn with_throttle_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.throttle_statuses = statuses.into_iter().collect();
        self
    }

    /// Treats transport failures as soft blocks so they share the retry budget.
    #[must_use]
    pub fn with_transport_retries(mut self, retry: bool) -> Self {
        self.retry_transport = retry;
        self
    }

    /// The configured signals.
    #[must_use]
    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    /// Classifies a response whose body has already been parsed.
    #[must_use]
    pub fn classify(
        &self,
        query: &SearchQuery,
        http_status: u16,
        body: &str,
        document: &Html,
    ) -> Classification {
        if self.throttle_statuses.contains(&http_status) {
            return Classification::soft_blocked(THROTTLE_SIGNAL);
        }
        if !(200..300).contains(&http_status) {
            return Classification::fatal();
        }

        let body_lower = body.to_lowercase();
        let view = PageView {
            query,
            http_status,
            body,
            body_lower: &body_lower,
            document,
        };
        match self.signals.first_match(&view) {
            Some(signal) => Classification::soft_blocked(signal),
            None => Classification::ok(),
        }
    }

    /// Parses and classifies a response body.
    #[must_use]
    pub fn classify_body(&self, query: &SearchQuery, http_status: u16, body: &str) -> Classification {
        let document = Html::parse_document(body);
        self.classify(query, http_status, body, &document)
    }

    /// Labels a fetch that failed below HTTP.
    ///
    /// Fatal unless transport retries were enabled.
    #[must_use]
    pub fn classify_transport_failure(&self) -> Classification {
        if self.retry_transport {
            Classification::soft_blocked(TRANSPORT_SIGNAL)
        } else {
            Classification::fatal()
        }
    }
}
