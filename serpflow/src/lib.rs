//! # Serpflow
//!
//! Bing results-page retrieval and extraction with soft-block recovery.
//!
//! Serpflow turns a list of search terms or search URLs into typed records:
//!
//! - **Query building**: deterministic Bing request URLs per term, market and page
//! - **Page classification**: tells real result pages from CAPTCHA and throttling interstitials
//! - **Extraction**: organic results, ads, people-also-ask and related searches
//! - **Pagination**: page or result limits with a hard ceiling per query
//! - **Retry and backoff**: header mutation and exponential backoff on soft blocks
//! - **Orchestration**: many jobs at once under a concurrency limit, records in input order
//! - **Export**: JSON, CSV and XML files over the collected records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use serpflow::prelude::*;
//! use std::sync::Arc;
//!
//! let scraper = SerpScraper::new(ScraperSettings::default())?;
//! let inputs = vec![SearchInput::term("apify").with_max_results(10)];
//!
//! let report = scraper.run(&inputs, Arc::new(CancellationToken::new())).await?;
//! scraper.export(&report)?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod classifier;
pub mod config;
pub mod core;
pub mod errors;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod observability;
pub mod orchestrator;
pub mod pagination;
pub mod query;
pub mod retry;
pub mod runner;
pub mod snapshot;
pub mod testing;

pub use errors::{SerpError, SerpResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::classifier::{Classification, PageClassifier};
    pub use crate::config::{
        InputFile, OutputSettings, RequestSettings, ScraperSettings, SearchInput,
    };
    pub use crate::core::{
        AttemptState, JobReport, OrganicResult, PageDisposition, PageReport, PageStatus,
        PaidResult, QaPair, RelatedQuery, ResultKind, RunReport, RunSummary, SearchQuery,
        SearchRecord,
    };
    pub use crate::errors::{ConfigurationError, ExtractionInconsistency, SerpError, SerpResult};
    pub use crate::export::{export_all, JsonFileSink, OutputFormat, RecordSink};
    pub use crate::extract::{FieldLocator, ResultExtractor};
    #[cfg(feature = "http")]
    pub use crate::fetch::ReqwestFetcher;
    pub use crate::fetch::{FetchConfig, FetchRequest, FetchResponse, Fetcher};
    pub use crate::observability::init_logging;
    pub use crate::orchestrator::{JobOrchestrator, OrchestratorConfig, SearchJob};
    pub use crate::pagination::{Limit, PaginationController, PaginationPolicy};
    pub use crate::query::{QueryBuilder, QueryParams};
    pub use crate::retry::{RetryEngine, RetryPolicy};
    pub use crate::runner::SerpScraper;
    pub use crate::snapshot::{FileSnapshotStore, SnapshotStore};
}
