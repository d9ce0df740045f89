//! Bounded concurrent execution of search jobs.
//!
//! Jobs run as tokio tasks gated by a semaphore; pages inside a job are
//! strictly sequential. Job reports come back in input order no matter
//! which job finished first.

use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::job::SearchJob;
use crate::cancellation::CancellationToken;
use crate::core::{JobReport, PageReport, RunReport, RunSummary};
use crate::pagination::{PaginationController, PaginationDecision, PaginationPolicy};
use crate::query::QueryBuilder;
use crate::retry::{PageResult, RetryEngine};

fn default_max_concurrency() -> usize {
    10
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Jobs allowed to run at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// When to stop paginating.
    #[serde(default)]
    pub pagination: PaginationPolicy,
    /// Lower bound of the pause between two pages of a job, in milliseconds.
    #[serde(default)]
    pub page_delay_min_ms: u64,
    /// Upper bound of the pause between two pages of a job, in milliseconds.
    #[serde(default)]
    pub page_delay_max_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            pagination: PaginationPolicy::default(),
            page_delay_min_ms: 0,
            page_delay_max_ms: 0,
        }
    }
}

impl OrchestratorConfig {
    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the pagination policy.
    #[must_use]
    pub fn with_pagination(mut self, policy: PaginationPolicy) -> Self {
        self.pagination = policy;
        self
    }

    /// Sets the pause between pages.
    #[must_use]
    pub fn with_page_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.page_delay_min_ms = min;
        self.page_delay_max_ms = max.max(min);
        self
    }

    fn page_delay(&self) -> Duration {
        if self.page_delay_max_ms == 0 {
            return Duration::ZERO;
        }
        let low = self.page_delay_min_ms.min(self.page_delay_max_ms);
        Duration::from_millis(rand::thread_rng().gen_range(low..=self.page_delay_max_ms))
    }
}

/// Runs many jobs against one [`RetryEngine`].
#[derive(Debug, Clone)]
pub struct JobOrchestrator {
    engine: RetryEngine,
    builder: QueryBuilder,
    config: OrchestratorConfig,
}

impl JobOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(engine: RetryEngine, config: OrchestratorConfig) -> Self {
        Self {
            engine,
            builder: QueryBuilder::new(),
            config,
        }
    }

    /// Uses a custom query builder for follow-up pages.
    #[must_use]
    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The settings in use.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs every job and returns the run report.
    ///
    /// Never fails: aborted pages, failed jobs and cancellation all end up in
    /// the report.
    pub async fn run(&self, jobs: Vec<SearchJob>, cancel: Arc<CancellationToken>) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        info!(%run_id, jobs = jobs.len(), max_concurrency = self.config.max_concurrency, "Run started");

        let mut labels = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let id = job.id;
            let term = job.term().to_string();
            let worker = self.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let report = worker.run_job(job, &cancel, permit.is_some()).await;
                drop(permit);
                report
            });
            labels.push((id, term));
            handles.push(handle);
        }

        let mut reports = Vec::with_capacity(handles.len());
        for ((id, term), joined) in labels.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(job_id = %id, term = %term, error = %err, "Job task failed");
                    reports.push(JobReport::failed(id, term, format!("job task failed: {err}")));
                }
            }
        }

        let summary = RunSummary::from_jobs(&reports);
        info!(
            %run_id,
            ok_pages = summary.ok_pages,
            aborted_pages = summary.aborted_pages,
            retried_pages = summary.retried_pages,
            not_attempted_pages = summary.not_attempted_pages,
            records = summary.records,
            "Run finished"
        );

        RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled: cancel.is_cancelled(),
            jobs: reports,
            summary,
        }
    }

    async fn run_job(&self, job: SearchJob, cancel: &CancellationToken, admitted: bool) -> JobReport {
        let mut report = JobReport::new(job.id, job.term());
        let mut pagination = match PaginationController::new(
            self.builder.clone(),
            job.first_query,
            job.limit,
            self.config.pagination,
        ) {
            Ok(controller) => controller,
            Err(err) => return JobReport::failed(job.id, report.term, err.to_string()),
        };

        if !admitted {
            skip_remaining(&mut report, &pagination, 0);
            return report;
        }

        loop {
            if cancel.is_cancelled() {
                skip_remaining(&mut report, &pagination, 0);
                break;
            }

            let query = pagination.current().clone();
            let outcome = self.engine.run_page(&query, cancel).await;
            report.pages.push(outcome.report());

            let decision = match outcome.result {
                PageResult::Cancelled => {
                    skip_remaining(&mut report, &pagination, 1);
                    break;
                }
                PageResult::Aborted(_) => pagination.on_abort(),
                PageResult::Extracted { record, .. } => {
                    let decision = pagination.on_page(record.organic_results.len());
                    report.records.push(*record);
                    decision
                }
            };

            match decision {
                PaginationDecision::Continue(next) => {
                    let delay = self.config.page_delay();
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => {}
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                    debug!(term = next.term(), page = next.page(), "Next page");
                }
                PaginationDecision::Done(reason) => {
                    let state = pagination.state();
                    debug!(
                        term = %state.term,
                        page = state.current_page,
                        collected = state.total_collected,
                        requested = state.total_requested,
                        %reason,
                        "Pagination finished"
                    );
                    break;
                }
            }
        }
        report
    }
}

/// Reports the planned pages from the current one onward as not attempted,
/// skipping the first `skip` of them.
fn skip_remaining(report: &mut JobReport, pagination: &PaginationController, skip: usize) {
    report.pages.extend(
        pagination
            .remaining_planned()
            .iter()
            .skip(skip)
            .map(|q| PageReport::not_attempted(q.page(), q.url())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PageDisposition;
    use crate::errors::SerpError;
    use crate::fetch::{FetchRequest, FetchResponse, Fetcher};
    use crate::pagination::Limit;
    use crate::query::QueryParams;
    use crate::retry::{JitterStrategy, RetryPolicy};
    use crate::testing::fakes::{FnFetcher, ScriptStep, ScriptedFetcher};
    use crate::testing::fixtures;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Barrier;

    fn policy() -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(2)
            .with_base_delay_ms(1)
            .with_max_delay_ms(2)
            .with_jitter(JitterStrategy::None)
    }

    fn job(term: &str, limit: Limit) -> SearchJob {
        SearchJob::from_params(
            &QueryBuilder::new(),
            &QueryParams::new(term, "en-US", "en", 10),
            limit,
        )
        .unwrap()
    }

    fn term_of(url: &str) -> String {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    fn page_of(url: &str) -> u32 {
        let first: u32 = url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "first")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap();
        (first - 1) / 10 + 1
    }

    fn serp_router() -> FnFetcher {
        FnFetcher::new(|req| {
            let term = term_of(&req.url);
            if term.starts_with("blocked") {
                ScriptStep::ok(fixtures::CAPTCHA_PAGE)
            } else {
                ScriptStep::ok(fixtures::serp_page(&term, page_of(&req.url), 10))
            }
        })
    }

    #[tokio::test]
    async fn test_apify_single_record() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptStep::ok(fixtures::APIFY_SERP)]));
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher.clone(), policy()),
            OrchestratorConfig::default(),
        );

        let report = orchestrator
            .run(vec![job("apify", Limit::Results(10))], Arc::new(CancellationToken::new()))
            .await;

        let records: Vec<_> = report.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].search_query.page(), 1);
        assert!(records[0].organic_results.len() <= 10);
        assert_eq!(records[0].results_total, 30_100);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(report.summary.ok_pages, 1);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_jobs_reported_in_input_order_with_page_order() {
        let fetcher = Arc::new(serp_router().with_latency(Duration::from_millis(2)));
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher, policy()),
            OrchestratorConfig::default().with_max_concurrency(4),
        );
        let terms: Vec<String> = (0..8).map(|i| format!("term{i}")).collect();
        let jobs = terms.iter().map(|t| job(t, Limit::Pages(3))).collect();

        let report = orchestrator.run(jobs, Arc::new(CancellationToken::new())).await;

        let reported: Vec<&str> = report.jobs.iter().map(|j| j.term.as_str()).collect();
        assert_eq!(reported, terms.iter().map(String::as_str).collect::<Vec<_>>());
        for job in &report.jobs {
            let pages: Vec<u32> = job.records.iter().map(|r| r.search_query.page()).collect();
            assert_eq!(pages, vec![1, 2, 3]);
        }
        assert_eq!(report.summary.records, 24);
    }

    #[tokio::test]
    async fn test_aborted_page_does_not_cancel_siblings() {
        let fetcher = Arc::new(serp_router());
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher, policy()),
            OrchestratorConfig::default(),
        );
        let jobs = vec![
            job("alpha", Limit::Pages(1)),
            job("blocked", Limit::Pages(1)),
            job("gamma", Limit::Pages(1)),
        ];

        let report = orchestrator.run(jobs, Arc::new(CancellationToken::new())).await;

        assert_eq!(report.summary.ok_pages, 2);
        assert_eq!(report.summary.aborted_pages, 1);
        assert_eq!(report.summary.retried_pages, 1);
        assert_eq!(report.summary.soft_blocked_attempts, 3);
        assert!(report.jobs[1].records.is_empty());
        let (term, page) = report.aborted_pages().next().unwrap();
        assert_eq!(term, "blocked");
        assert_eq!(page.attempts, 3);
    }

    #[tokio::test]
    async fn test_aborted_pages_do_not_end_their_job() {
        let fetcher = Arc::new(FnFetcher::new(|req| {
            let page = page_of(&req.url);
            if page == 2 || page == 3 {
                ScriptStep::status(404, "")
            } else {
                ScriptStep::ok(fixtures::serp_page("flaky", page, 10))
            }
        }));
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher.clone(), RetryPolicy::no_retries()),
            OrchestratorConfig::default(),
        );

        let report = orchestrator
            .run(vec![job("flaky", Limit::Pages(5))], Arc::new(CancellationToken::new()))
            .await;

        let job = &report.jobs[0];
        let dispositions: Vec<(u32, PageDisposition)> =
            job.pages.iter().map(|p| (p.page, p.disposition)).collect();
        assert_eq!(
            dispositions,
            vec![
                (1, PageDisposition::Extracted),
                (2, PageDisposition::Aborted),
                (3, PageDisposition::Aborted),
                (4, PageDisposition::Extracted),
                (5, PageDisposition::Extracted),
            ]
        );
        let pages: Vec<u32> = job.records.iter().map(|r| r.search_query.page()).collect();
        assert_eq!(pages, vec![1, 4, 5]);
        assert_eq!(fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let fetcher = Arc::new(serp_router().with_latency(Duration::from_millis(15)));
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher.clone(), policy()),
            OrchestratorConfig::default().with_max_concurrency(3),
        );
        let jobs = (0..10).map(|i| job(&format!("t{i}"), Limit::Pages(1))).collect();

        orchestrator.run(jobs, Arc::new(CancellationToken::new())).await;

        assert_eq!(fetcher.calls(), 10);
        assert!(fetcher.peak_in_flight() <= 3);
    }

    /// Holds every fetch until `parties` fetches are waiting at once.
    struct BarrierFetcher {
        barrier: Barrier,
    }

    #[async_trait]
    impl Fetcher for BarrierFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SerpError> {
            self.barrier.wait().await;
            let body = fixtures::serp_page(&term_of(&request.url), page_of(&request.url), 10);
            Ok(FetchResponse::new(200, body))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fifty_jobs_run_concurrently() {
        let fetcher = Arc::new(BarrierFetcher {
            barrier: Barrier::new(50),
        });
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher, policy()),
            OrchestratorConfig::default().with_max_concurrency(50),
        );
        let jobs = (0..50).map(|i| job(&format!("job{i}"), Limit::Pages(2))).collect();

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            orchestrator.run(jobs, Arc::new(CancellationToken::new())),
        )
        .await
        .expect("jobs must not block each other");

        assert_eq!(report.summary.ok_pages, 100);
        for job in &report.jobs {
            let pages: Vec<u32> = job.records.iter().map(|r| r.search_query.page()).collect();
            assert_eq!(pages, vec![1, 2]);
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let fetcher = Arc::new(serp_router());
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher.clone(), policy()),
            OrchestratorConfig::default(),
        );
        let cancel = Arc::new(CancellationToken::new());
        cancel.cancel("shutdown");

        let report = orchestrator
            .run(vec![job("a", Limit::Pages(3)), job("b", Limit::Results(20))], cancel)
            .await;

        assert!(report.cancelled);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(report.summary.not_attempted_pages, 5);
        assert!(report.jobs.iter().flat_map(|j| &j.pages).all(|p| p.disposition == PageDisposition::NotAttempted));
    }

    #[tokio::test]
    async fn test_cancel_mid_run() {
        let fetcher = Arc::new(serp_router().with_latency(Duration::from_millis(40)));
        let orchestrator = JobOrchestrator::new(
            RetryEngine::new(fetcher, policy()),
            OrchestratorConfig::default(),
        );
        let cancel = Arc::new(CancellationToken::new());
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                cancel.cancel("deadline");
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.run(vec![job("long", Limit::Pages(10))], cancel),
        )
        .await
        .expect("cancellation should stop the run promptly");
        canceller.await.unwrap();

        let job = &report.jobs[0];
        assert!(report.cancelled);
        assert_eq!(job.pages.len(), 10);
        assert!(!job.records.is_empty());
        assert!(job.pages.iter().any(|p| p.disposition == PageDisposition::NotAttempted));
        let pages: Vec<u32> = job.pages.iter().map(|p| p.page).collect();
        assert_eq!(pages, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_config_defaults() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.page_delay(), Duration::ZERO);
    }
}
