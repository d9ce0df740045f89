//! Per-page, per-job and per-run reports.
//!
//! Failures are recorded here instead of being raised: a run always completes
//! with whatever records it could collect, and aborted or skipped pages carry
//! an explicit disposition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::SearchRecord;
use super::status::PageDisposition;
use crate::errors::SerpError;

/// Why a page was given up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The fetch failed below HTTP.
    Transport {
        /// Transport error message.
        message: String,
    },
    /// A non-success status that retrying does not fix.
    HttpStatus {
        /// The status code.
        status: u16,
    },
    /// Still soft-blocked after every retry.
    SoftBlockExhausted {
        /// Signals that fired, one per blocked attempt.
        signals: Vec<String>,
    },
}

impl AbortReason {
    /// Converts the reason into the matching error value.
    #[must_use]
    pub fn to_error(&self, url: &str, attempts: u32) -> SerpError {
        match self {
            Self::Transport { message } => SerpError::transport(url, message.clone()),
            Self::HttpStatus { status } => {
                SerpError::transport(url, format!("HTTP status {status}"))
            }
            Self::SoftBlockExhausted { signals } => SerpError::SoftBlock {
                url: url.to_string(),
                attempts,
                signal: signals.last().cloned().unwrap_or_default(),
            },
        }
    }
}

/// What happened to one page of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    /// 1-based page number.
    pub page: u32,
    /// Request URL.
    pub url: String,
    /// Final disposition.
    pub disposition: PageDisposition,
    /// Fetches performed.
    pub attempts: u32,
    /// Attempts that came back soft-blocked.
    pub soft_blocks: u32,
    /// Organic results extracted.
    pub organic_count: usize,
    /// Set when the page was aborted.
    pub abort_reason: Option<AbortReason>,
    /// Set when an `Ok` page lacked its organic container.
    pub extraction_inconsistency: Option<String>,
}

impl PageReport {
    /// A page that was never fetched.
    #[must_use]
    pub fn not_attempted(page: u32, url: impl Into<String>) -> Self {
        Self {
            page,
            url: url.into(),
            disposition: PageDisposition::NotAttempted,
            attempts: 0,
            soft_blocks: 0,
            organic_count: 0,
            abort_reason: None,
            extraction_inconsistency: None,
        }
    }

    /// Whether at least one retry happened.
    #[must_use]
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// The abort reason as an error, for aborted pages.
    #[must_use]
    pub fn error(&self) -> Option<SerpError> {
        self.abort_reason
            .as_ref()
            .map(|reason| reason.to_error(&self.url, self.attempts))
    }
}

/// All pages and records for one input item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// Job identifier.
    pub job_id: Uuid,
    /// Search term of the job.
    pub term: String,
    /// Records in page order.
    pub records: Vec<SearchRecord>,
    /// One entry per page attempted or skipped, in page order.
    pub pages: Vec<PageReport>,
    /// Set when the job itself failed (for example, the task panicked).
    pub error: Option<String>,
}

impl JobReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(job_id: Uuid, term: impl Into<String>) -> Self {
        Self {
            job_id,
            term: term.into(),
            records: Vec::new(),
            pages: Vec::new(),
            error: None,
        }
    }

    /// Records a failed job.
    #[must_use]
    pub fn failed(job_id: Uuid, term: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(job_id, term)
        }
    }

    fn count(&self, disposition: PageDisposition) -> usize {
        self.pages
            .iter()
            .filter(|p| p.disposition == disposition)
            .count()
    }
}

/// Counts across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Jobs processed.
    pub jobs: usize,
    /// Jobs that failed as a whole.
    pub failed_jobs: usize,
    /// Pages that produced a record.
    pub ok_pages: usize,
    /// Pages given up on.
    pub aborted_pages: usize,
    /// Pages that needed at least one retry.
    pub retried_pages: usize,
    /// Pages skipped because of cancellation.
    pub not_attempted_pages: usize,
    /// Soft-blocked responses seen across all pages.
    pub soft_blocked_attempts: usize,
    /// `Ok` pages with an extraction inconsistency.
    pub inconsistent_pages: usize,
    /// Records emitted.
    pub records: usize,
}

impl RunSummary {
    /// Builds the summary from job reports.
    #[must_use]
    pub fn from_jobs(jobs: &[JobReport]) -> Self {
        let mut summary = Self {
            jobs: jobs.len(),
            ..Self::default()
        };
        for job in jobs {
            if job.error.is_some() {
                summary.failed_jobs += 1;
            }
            summary.ok_pages += job.count(PageDisposition::Extracted);
            summary.aborted_pages += job.count(PageDisposition::Aborted);
            summary.not_attempted_pages += job.count(PageDisposition::NotAttempted);
            summary.retried_pages += job.pages.iter().filter(|p| p.was_retried()).count();
            summary.soft_blocked_attempts +=
                job.pages.iter().map(|p| p.soft_blocks as usize).sum::<usize>();
            summary.inconsistent_pages += job
                .pages
                .iter()
                .filter(|p| p.extraction_inconsistency.is_some())
                .count();
            summary.records += job.records.len();
        }
        summary
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
    /// Jobs in input order.
    pub jobs: Vec<JobReport>,
    /// Aggregated counts.
    pub summary: RunSummary,
}

impl RunReport {
    /// All records, job by job, each job in page order.
    pub fn records(&self) -> impl Iterator<Item = &SearchRecord> {
        self.jobs.iter().flat_map(|job| job.records.iter())
    }

    /// Consumes the report and returns the records.
    #[must_use]
    pub fn into_records(self) -> Vec<SearchRecord> {
        self.jobs.into_iter().flat_map(|job| job.records).collect()
    }

    /// Page reports for aborted pages, with their job term.
    pub fn aborted_pages(&self) -> impl Iterator<Item = (&str, &PageReport)> {
        self.jobs.iter().flat_map(|job| {
            job.pages
                .iter()
                .filter(|p| p.disposition == PageDisposition::Aborted)
                .map(move |p| (job.term.as_str(), p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(disposition: PageDisposition, attempts: u32, soft_blocks: u32) -> PageReport {
        PageReport {
            page: 1,
            url: "u".to_string(),
            disposition,
            attempts,
            soft_blocks,
            organic_count: 0,
            abort_reason: None,
            extraction_inconsistency: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut job = JobReport::new(Uuid::new_v4(), "rust");
        job.pages.push(page(PageDisposition::Extracted, 1, 0));
        job.pages.push(page(PageDisposition::Extracted, 3, 2));
        job.pages.push(page(PageDisposition::Aborted, 4, 4));
        job.pages.push(PageReport::not_attempted(4, "u4"));

        let failed = JobReport::failed(Uuid::new_v4(), "other", "panicked");
        let summary = RunSummary::from_jobs(&[job, failed]);

        assert_eq!(summary.jobs, 2);
        assert_eq!(summary.failed_jobs, 1);
        assert_eq!(summary.ok_pages, 2);
        assert_eq!(summary.aborted_pages, 1);
        assert_eq!(summary.not_attempted_pages, 1);
        assert_eq!(summary.retried_pages, 2);
        assert_eq!(summary.soft_blocked_attempts, 6);
    }

    #[test]
    fn test_abort_reason_to_error() {
        let reason = AbortReason::SoftBlockExhausted {
            signals: vec!["captcha_marker".to_string(), "empty_results".to_string()],
        };
        let err = reason.to_error("https://www.bing.com/search?q=x", 4);
        assert!(err.to_string().contains("empty_results"));
        assert!(!err.is_fatal());

        let fatal = AbortReason::HttpStatus { status: 404 }.to_error("u", 1);
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_page_error_only_for_aborted_pages() {
        let mut aborted = page(PageDisposition::Aborted, 3, 3);
        aborted.abort_reason = Some(AbortReason::SoftBlockExhausted {
            signals: vec!["captcha_marker".to_string(); 3],
        });

        let err = aborted.error().unwrap();
        assert!(matches!(err, SerpError::SoftBlock { attempts: 3, .. }));
        assert!(page(PageDisposition::Extracted, 1, 0).error().is_none());
    }

    #[test]
    fn test_abort_reason_serialization() {
        let json = serde_json::to_value(AbortReason::HttpStatus { status: 403 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "http_status", "status": 403}));
    }
}
