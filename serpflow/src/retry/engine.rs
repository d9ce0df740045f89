//! Per-page fetch, classify, retry loop.
//!
//! One call to [`RetryEngine::run_page`] drives a single page through
//! `Pending → Fetching → Classifying → {Extracted, Retrying, Aborted}`.
//! The parsed document never crosses an `.await`: classification and
//! extraction happen in one synchronous step that returns owned data.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::headers::{initial_request, retry_request};
use super::policy::{RetryDecision, RetryPolicy};
use crate::cancellation::CancellationToken;
use crate::classifier::PageClassifier;
use crate::core::{
    AbortReason, AttemptState, PageDisposition, PageReport, PageStatus, SearchQuery,
    SearchRecord, SearchResultPage,
};
use crate::errors::{ExtractionInconsistency, SerpError};
use crate::extract::{ExtractionOutcome, ResultExtractor};
use crate::fetch::{FetchResponse, Fetcher};
use crate::observability::SpanTimer;
use crate::snapshot::SnapshotStore;

/// How a page ended.
#[derive(Debug, Clone)]
pub enum PageResult {
    /// The page was `Ok` and produced a record.
    Extracted {
        /// The record.
        record: Box<SearchRecord>,
        /// Set when the organic container was missing.
        inconsistency: Option<ExtractionInconsistency>,
    },
    /// The page was given up on.
    Aborted(AbortReason),
    /// Cancellation arrived before the page finished.
    Cancelled,
}

/// Everything known about one page after the engine is done with it.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// The query that was run.
    pub query: SearchQuery,
    /// Final result.
    pub result: PageResult,
    /// Fetches performed.
    pub attempts: u32,
    /// Soft-block signals, one per blocked attempt.
    pub signals: Vec<String>,
    /// States visited, in order.
    pub trace: Vec<AttemptState>,
}

impl PageOutcome {
    /// Organic results extracted (0 unless extracted).
    #[must_use]
    pub fn organic_count(&self) -> usize {
        match &self.result {
            PageResult::Extracted { record, .. } => record.organic_results.len(),
            _ => 0,
        }
    }

    /// The page's line in the job report.
    #[must_use]
    pub fn report(&self) -> PageReport {
        let (disposition, abort_reason, inconsistency) = match &self.result {
            PageResult::Extracted { inconsistency, .. } => (
                PageDisposition::Extracted,
                None,
                inconsistency.as_ref().map(|i| i.reason.clone()),
            ),
            PageResult::Aborted(reason) => (PageDisposition::Aborted, Some(reason.clone()), None),
            PageResult::Cancelled => (PageDisposition::NotAttempted, None, None),
        };
        PageReport {
            page: self.query.page(),
            url: self.query.url().to_string(),
            disposition,
            attempts: self.attempts,
            soft_blocks: u32::try_from(self.signals.len()).unwrap_or(u32::MAX),
            organic_count: self.organic_count(),
            abort_reason,
            extraction_inconsistency: inconsistency,
        }
    }

    /// Takes the record out of an extracted outcome.
    #[must_use]
    pub fn into_record(self) -> Option<SearchRecord> {
        match self.result {
            PageResult::Extracted { record, .. } => Some(*record),
            _ => None,
        }
    }
}

enum Evaluation {
    Extracted(ExtractionOutcome, FetchResponse),
    SoftBlocked(String),
    Fatal(AbortReason),
}

/// Records the state walk of one page.
struct Trace(Vec<AttemptState>);

impl Trace {
    fn new() -> Self {
        Self(vec![AttemptState::Pending])
    }

    fn current(&self) -> AttemptState {
        self.0.last().copied().unwrap_or_default()
    }

    fn enter(&mut self, next: AttemptState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal transition {} -> {}",
            self.current(),
            next
        );
        self.0.push(next);
    }
}

/// Fetches one page with soft-block retries.
#[derive(Clone)]
pub struct RetryEngine {
    fetcher: Arc<dyn Fetcher>,
    classifier: Arc<PageClassifier>,
    extractor: Arc<ResultExtractor>,
    policy: RetryPolicy,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    include_html: bool,
}

impl std::fmt::Debug for RetryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryEngine")
            .field("policy", &self.policy)
            .field("classifier", &self.classifier)
            .field("snapshots", &self.snapshots.is_some())
            .field("include_html", &self.include_html)
            .finish_non_exhaustive()
    }
}

impl RetryEngine {
    /// Creates an engine with the default classifier and extractor.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            classifier: Arc::new(PageClassifier::default()),
            extractor: Arc::new(ResultExtractor::default()),
            policy,
            snapshots: None,
            include_html: false,
        }
    }

    /// Replaces the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: PageClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Replaces the extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: ResultExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Stores the HTML of every extracted page.
    #[must_use]
    pub fn with_snapshots(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    /// Keeps the raw HTML in each record.
    #[must_use]
    pub fn with_include_html(mut self, include: bool) -> Self {
        self.include_html = include;
        self
    }

    /// The retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs one page to completion.
    pub async fn run_page(&self, query: &SearchQuery, cancel: &CancellationToken) -> PageOutcome {
        let mut trace = Trace::new();
        let mut attempts = 0u32;
        let mut signals = Vec::new();
        let mut request = initial_request(query);

        let finish = |trace: Trace, attempts, signals, result| PageOutcome {
            query: query.clone(),
            result,
            attempts,
            signals,
            trace: trace.0,
        };

        loop {
            if cancel.is_cancelled() {
                trace.enter(AttemptState::Aborted);
                return finish(trace, attempts, signals, PageResult::Cancelled);
            }

            trace.enter(AttemptState::Fetching);
            attempts += 1;
            debug!(term = query.term(), page = query.page(), attempt = attempts, "Fetching page");

            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                response = self.fetcher.fetch(&request) => Some(response),
            };
            let Some(fetched) = fetched else {
                trace.enter(AttemptState::Aborted);
                return finish(trace, attempts, signals, PageResult::Cancelled);
            };

            trace.enter(AttemptState::Classifying);
            let evaluation = match fetched {
                Ok(response) => self.evaluate(query, response),
                Err(err) => self.evaluate_transport_failure(query, err),
            };

            match evaluation {
                Evaluation::Extracted(outcome, response) => {
                    trace.enter(AttemptState::Extracted);
                    let record = self.finish_record(query, outcome.record, response).await;
                    if let Some(inconsistency) = &outcome.inconsistency {
                        warn!(term = query.term(), page = query.page(), %inconsistency, "Extraction inconsistency");
                    }
                    info!(
                        term = query.term(),
                        page = query.page(),
                        attempts,
                        organic = record.organic_results.len(),
                        "Page extracted"
                    );
                    return finish(
                        trace,
                        attempts,
                        signals,
                        PageResult::Extracted {
                            record: Box::new(record),
                            inconsistency: outcome.inconsistency,
                        },
                    );
                }
                Evaluation::Fatal(reason) => {
                    trace.enter(AttemptState::Aborted);
                    return finish(trace, attempts, signals, PageResult::Aborted(reason));
                }
                Evaluation::SoftBlocked(signal) => {
                    warn!(term = query.term(), page = query.page(), attempt = attempts, signal = %signal, "Soft block detected");
                    signals.push(signal);

                    let delay = match self.policy.decide(attempts - 1) {
                        RetryDecision::Retry(delay) => delay,
                        RetryDecision::GiveUp => {
                            trace.enter(AttemptState::Aborted);
                            let reason = AbortReason::SoftBlockExhausted {
                                signals: signals.clone(),
                            };
                            return finish(trace, attempts, signals, PageResult::Aborted(reason));
                        }
                    };

                    trace.enter(AttemptState::Retrying);
                    debug!(
                        term = query.term(),
                        page = query.page(),
                        attempt = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Backing off before retry"
                    );
                    let slept = tokio::select! {
                        biased;
                        () = cancel.cancelled() => false,
                        () = tokio::time::sleep(delay) => true,
                    };
                    if !slept {
                        trace.enter(AttemptState::Aborted);
                        return finish(trace, attempts, signals, PageResult::Cancelled);
                    }
                    request = retry_request(query, self.policy.rotate_user_agent);
                }
            }
        }
    }

    fn evaluate(&self, query: &SearchQuery, response: FetchResponse) -> Evaluation {
        let document = scraper::Html::parse_document(&response.body);
        let verdict = self
            .classifier
            .classify(query, response.status, &response.body, &document);

        match verdict.status {
            PageStatus::Ok => {
                let timer = SpanTimer::start("extract");
                let outcome = self.extractor.extract(query, &document);
                debug!(term = query.term(), page = query.page(), elapsed_ms = timer.finish(), "Extraction finished");
                Evaluation::Extracted(outcome, response)
            }
            PageStatus::SoftBlocked => {
                Evaluation::SoftBlocked(verdict.signal.unwrap_or_else(|| "unknown".to_string()))
            }
            PageStatus::Fatal => {
                warn!(term = query.term(), page = query.page(), status = response.status, "Unexpected HTTP status");
                Evaluation::Fatal(AbortReason::HttpStatus {
                    status: response.status,
                })
            }
        }
    }

    fn evaluate_transport_failure(&self, query: &SearchQuery, err: SerpError) -> Evaluation {
        let verdict = self.classifier.classify_transport_failure();
        warn!(term = query.term(), page = query.page(), error = %err, verdict = %verdict.status, "Transport failure");

        match (verdict.status, verdict.signal) {
            (PageStatus::SoftBlocked, Some(signal)) => Evaluation::SoftBlocked(signal),
            _ => {
                let message = match err {
                    SerpError::Transport { message, .. } => message,
                    other => other.to_string(),
                };
                Evaluation::Fatal(AbortReason::Transport { message })
            }
        }
    }

    async fn finish_record(
        &self,
        query: &SearchQuery,
        mut record: SearchRecord,
        response: FetchResponse,
    ) -> SearchRecord {
        let mut page = SearchResultPage::new(query.clone(), PageStatus::Ok, response.status, response.body);

        if let Some(store) = &self.snapshots {
            match store.store(query, page.content()).await {
                Ok(url) => page.snapshot_url = Some(url),
                Err(err) => {
                    warn!(term = query.term(), page = query.page(), error = %err, "Snapshot failed");
                }
            }
        }

        record.html_snapshot_url = page.snapshot_url.take();
        if self.include_html {
            record.html = page.take_content();
        }
        record
    }
}
