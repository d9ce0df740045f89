//! Soft-block retries with backoff.

mod engine;
mod headers;
mod policy;

pub use engine::{PageOutcome, PageResult, RetryEngine};
pub use headers::{initial_request, retry_request, DEFAULT_USER_AGENTS, RETRY_CHROME_VERSIONS};
pub use policy::{JitterStrategy, RetryDecision, RetryPolicy};
