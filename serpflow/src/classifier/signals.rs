//! Soft-block signals.
//!
//! A signal looks at an HTTP-successful page and decides whether it is a
//! degraded response rather than real results. Signals are policy: callers
//! can add their own or drop the defaults through [`SignalSet`].

use scraper::{Html, Selector};
use std::fmt;
use std::sync::Arc;

use crate::core::SearchQuery;

/// Phrases seen on Bing's CAPTCHA and throttling interstitials.
pub const DEFAULT_SOFT_BLOCK_HINTS: &[&str] = &[
    "unusual traffic",
    "verify that you are a human",
    "detected unusual activity",
    "please try again later",
    "are you a robot",
    "unusual behavior from your computer",
    "one last step",
];

/// Everything a signal may inspect.
pub struct PageView<'a> {
    /// The query that was sent.
    pub query: &'a SearchQuery,
    /// HTTP status of the response.
    pub http_status: u16,
    /// Raw body.
    pub body: &'a str,
    /// Lowercased body, computed once per page.
    pub body_lower: &'a str,
    /// Parsed document.
    pub document: &'a Html,
}

/// A content-level degradation detector.
pub trait SoftBlockSignal: Send + Sync + fmt::Debug {
    /// Stable name reported in logs and abort reasons.
    fn name(&self) -> &str;

    /// Returns true if the page looks degraded.
    fn detect(&self, page: &PageView<'_>) -> bool;
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selector must parse")
}

/// Fires on known CAPTCHA / interstitial text or markup.
///
/// Challenge markup always fires. The text hints only count on pages without
/// organic results or a "no results" marker, since a healthy page for a query
/// like "unusual traffic" echoes the phrase in its titles and snippets.
#[derive(Debug)]
pub struct CaptchaMarkerSignal {
    hints: Vec<String>,
    markup: Selector,
    results: Selector,
}

impl Default for CaptchaMarkerSignal {
    fn default() -> Self {
        Self::new(DEFAULT_SOFT_BLOCK_HINTS.iter().map(ToString::to_string))
    }
}

impl CaptchaMarkerSignal {
    /// Creates the signal with a custom phrase list.
    pub fn new<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hints: hints.into_iter().map(|h| h.into().to_lowercase()).collect(),
            markup: selector("#b_captcha, #captcha, .captcha, form#challenge-form, iframe[src*=\"captcha\"]"),
            results: selector("#b_results li.b_algo, #b_results li.b_no, #b_results .b_no"),
        }
    }

    /// Adds a phrase.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into().to_lowercase());
        self
    }
}

impl SoftBlockSignal for CaptchaMarkerSignal {
    fn name(&self) -> &str {
        "captcha_marker"
    }

    fn detect(&self, page: &PageView<'_>) -> bool {
        if page.document.select(&self.markup).next().is_some() {
            return true;
        }
        page.document.select(&self.results).next().is_none()
            && self.hints.iter().any(|hint| page.body_lower.contains(hint.as_str()))
    }
}

/// Fires when the page has none of the result-page scaffolding.
#[derive(Debug)]
pub struct MissingContainerSignal {
    containers: Selector,
}

impl Default for MissingContainerSignal {
    fn default() -> Self {
        Self {
            containers: selector("#b_results, #b_content"),
        }
    }
}

impl SoftBlockSignal for MissingContainerSignal {
    fn name(&self) -> &str {
        "missing_result_container"
    }

    fn detect(&self, page: &PageView<'_>) -> bool {
        page.document.select(&self.containers).next().is_none()
    }
}

/// Fires when results were requested but none came back and the page does not
/// carry Bing's explicit "no results" marker.
#[derive(Debug)]
pub struct EmptyResultsSignal {
    results: Selector,
    no_results: Selector,
}

impl Default for EmptyResultsSignal {
    fn default() -> Self {
        Self {
            results: selector("#b_results li.b_algo"),
            no_results: selector("li.b_no, .b_no"),
        }
    }
}

impl SoftBlockSignal for EmptyResultsSignal {
    fn name(&self) -> &str {
        "empty_results"
    }

    fn detect(&self, page: &PageView<'_>) -> bool {
        page.query.results_per_page() > 0
            && page.document.select(&self.results).next().is_none()
            && page.document.select(&self.no_results).next().is_none()
    }
}

/// Ordered collection of signals; the first one that fires wins.
#[derive(Clone)]
pub struct SignalSet {
    signals: Vec<Arc<dyn SoftBlockSignal>>,
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::empty()
            .with_signal(CaptchaMarkerSignal::default())
            .with_signal(MissingContainerSignal::default())
            .with_signal(EmptyResultsSignal::default())
    }
}

impl SignalSet {
    /// A set with no signals: every successful response is `Ok`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// Appends a signal.
    #[must_use]
    pub fn with_signal(mut self, signal: impl SoftBlockSignal + 'static) -> Self {
        self.signals.push(Arc::new(signal));
        self
    }

    /// Removes every signal with the given name.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.signals.retain(|s| s.name() != name);
        self
    }

    /// Names of the signals, in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.signals.iter().map(|s| s.name()).collect()
    }

    /// Returns the name of the first signal that fires.
    #[must_use]
    pub fn first_match(&self, page: &PageView<'_>) -> Option<&str> {
        self.signals
            .iter()
            .find(|s| s.detect(page))
            .map(|s| s.name())
    }

    /// Number of signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSet")
            .field("signals", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryBuilder, QueryParams};
    use crate::testing::fixtures;

    fn detect(signal: &dyn SoftBlockSignal, body: &str) -> bool {
        let query = QueryBuilder::new()
            .build(&QueryParams::new("apify", "en-US", "en", 10))
            .unwrap();
        let document = Html::parse_document(body);
        let lower = body.to_lowercase();
        signal.detect(&PageView {
            query: &query,
            http_status: 200,
            body,
            body_lower: &lower,
            document: &document,
        })
    }

    #[test]
    fn test_captcha_hint_detected() {
        let signal = CaptchaMarkerSignal::default();
        assert!(detect(&signal, fixtures::CAPTCHA_PAGE));
        assert!(!detect(&signal, fixtures::APIFY_SERP));
    }

    #[test]
    fn test_captcha_markup_detected() {
        let signal = CaptchaMarkerSignal::new(Vec::<String>::new());
        assert!(detect(&signal, "<html><body><div id=\"b_captcha\"></div></body></html>"));
    }

    #[test]
    fn test_hints_ignored_on_results_page() {
        let signal = CaptchaMarkerSignal::default();
        let page = fixtures::serp_page("unusual traffic", 1, 10);
        assert!(page.to_lowercase().contains("unusual traffic"));
        assert!(!detect(&signal, &page));

        let no_results = fixtures::NO_RESULTS_PAGE.replace("zqxjvbnm", "are you a robot");
        assert!(!detect(&signal, &no_results));
    }

    #[test]
    fn test_markup_detected_even_with_results() {
        let signal = CaptchaMarkerSignal::default();
        let page = fixtures::serp_page("apify", 1, 10)
            .replace("</body>", "<div id=\"b_captcha\"></div></body>");
        assert!(detect(&signal, &page));
    }

    #[test]
    fn test_custom_hint() {
        let signal = CaptchaMarkerSignal::new(Vec::<String>::new()).with_hint("Access Paused");
        assert!(detect(&signal, "<html><body><h1>access paused</h1></body></html>"));
    }

    #[test]
    fn test_missing_container() {
        let signal = MissingContainerSignal::default();
        assert!(detect(&signal, fixtures::EMPTY_SHELL));
        assert!(!detect(&signal, fixtures::APIFY_SERP));
    }

    #[test]
    fn test_empty_results_respects_no_results_marker() {
        let signal = EmptyResultsSignal::default();
        assert!(!detect(&signal, fixtures::NO_RESULTS_PAGE));
        assert!(detect(&signal, fixtures::CONTAINER_WITHOUT_RESULTS));
        assert!(!detect(&signal, fixtures::APIFY_SERP));
    }

    #[test]
    fn test_signal_set_editing() {
        let set = SignalSet::default();
        assert_eq!(
            set.names(),
            vec!["captcha_marker", "missing_result_container", "empty_results"]
        );

        let trimmed = set.without("empty_results");
        assert_eq!(trimmed.len(), 2);
        assert!(SignalSet::empty().is_empty());
    }
}
