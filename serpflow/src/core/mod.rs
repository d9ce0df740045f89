//! Core types for serpflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Typed search records and their JSON contract
//! - Page classification and attempt states
//! - Page, job and run reports

mod models;
mod page;
mod report;
mod status;

pub use models::{
    OrganicResult, PaidResult, QaPair, RelatedQuery, ResultKind, SearchQuery, SearchRecord,
};
pub use page::SearchResultPage;
pub use report::{AbortReason, JobReport, PageReport, RunReport, RunSummary};
pub use status::{AttemptState, PageDisposition, PageStatus};
