//! Pagination control for a single job.
//!
//! The controller owns the running totals of one job and decides, after each
//! page, whether another page is worth fetching. It never fetches anything
//! itself; the next query is derived through [`QueryBuilder`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::SearchQuery;
use crate::errors::ConfigurationError;
use crate::query::QueryBuilder;

pub use crate::query::{page_ceiling, MAX_RESULTS_PER_QUERY};

/// How much a job should collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Limit {
    /// Fetch at most this many pages.
    Pages(u32),
    /// Stop once this many organic results were collected.
    Results(u32),
}

impl Default for Limit {
    fn default() -> Self {
        Self::Pages(1)
    }
}

impl Limit {
    /// Rejects zero limits.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Pages(0) => Err(ConfigurationError::Zero { field: "maxPages" }),
            Self::Results(0) => Err(ConfigurationError::Zero { field: "maxResults" }),
            _ => Ok(()),
        }
    }

    /// Organic results the limit asks for at a given page size.
    #[must_use]
    pub fn total_requested(&self, results_per_page: u32) -> u64 {
        match *self {
            Self::Pages(pages) => u64::from(pages) * u64::from(results_per_page),
            Self::Results(results) => u64::from(results),
        }
    }
}

fn default_stop_on_first_empty() -> bool {
    true
}

fn default_max_consecutive_empty() -> u32 {
    2
}

/// Knobs for when to give up on further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPolicy {
    /// Stop as soon as one `Ok` page has no organic results.
    #[serde(default = "default_stop_on_first_empty")]
    pub stop_on_first_empty: bool,
    /// Consecutive empty pages that stop pagination when
    /// `stop_on_first_empty` is off.
    #[serde(default = "default_max_consecutive_empty")]
    pub max_consecutive_empty: u32,
    /// Consecutive aborted pages that stop pagination. Unset by default, so
    /// an aborted page never ends the job on its own.
    #[serde(default)]
    pub max_consecutive_aborts: Option<u32>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            stop_on_first_empty: default_stop_on_first_empty(),
            max_consecutive_empty: default_max_consecutive_empty(),
            max_consecutive_aborts: None,
        }
    }
}

impl PaginationPolicy {
    /// Sets whether a single empty page ends the job.
    #[must_use]
    pub fn with_stop_on_first_empty(mut self, stop: bool) -> Self {
        self.stop_on_first_empty = stop;
        self
    }

    /// Ends the job after `max` aborted pages in a row.
    #[must_use]
    pub fn with_max_consecutive_aborts(mut self, max: u32) -> Self {
        self.max_consecutive_aborts = Some(max.max(1));
        self
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Enough results were collected.
    Satisfied,
    /// An `Ok` page had no organic results.
    EmptyPage,
    /// Several `Ok` pages in a row had no organic results.
    ConsecutiveEmptyPages,
    /// The engine does not serve results beyond this page.
    Ceiling,
    /// The page limit was reached.
    PageLimit,
    /// Several pages in a row were aborted.
    ConsecutiveAborts,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::EmptyPage => write!(f, "empty_page"),
            Self::ConsecutiveEmptyPages => write!(f, "consecutive_empty_pages"),
            Self::Ceiling => write!(f, "ceiling"),
            Self::PageLimit => write!(f, "page_limit"),
            Self::ConsecutiveAborts => write!(f, "consecutive_aborts"),
        }
    }
}

/// What to do after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationDecision {
    /// Fetch this query next.
    Continue(SearchQuery),
    /// Stop.
    Done(StopReason),
}

/// Snapshot of the controller's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Search term.
    pub term: String,
    /// Organic results asked for.
    pub total_requested: u64,
    /// Organic results collected so far.
    pub total_collected: u64,
    /// Page currently being processed.
    pub current_page: u32,
}

/// Per-job pagination state machine.
#[derive(Debug, Clone)]
pub struct PaginationController {
    builder: QueryBuilder,
    policy: PaginationPolicy,
    current: SearchQuery,
    total_requested: u64,
    total_collected: u64,
    last_planned_page: u32,
    page_limit: Option<u32>,
    ceiling: u32,
    consecutive_empty: u32,
    consecutive_aborts: u32,
}

impl PaginationController {
    /// Starts pagination at `first`.
    pub fn new(
        builder: QueryBuilder,
        first: SearchQuery,
        limit: Limit,
        policy: PaginationPolicy,
    ) -> Result<Self, ConfigurationError> {
        limit.validate()?;
        let rpp = first.results_per_page();
        let start = first.page();
        let ceiling = page_ceiling(rpp);
        if start == 0 {
            return Err(ConfigurationError::InvalidPage(start));
        }
        if start > ceiling {
            return Err(ConfigurationError::PageBeyondCeiling {
                page: start,
                ceiling,
            });
        }
        let page_limit = match limit {
            Limit::Pages(pages) => Some(start.saturating_add(pages - 1)),
            Limit::Results(_) => None,
        };
        let planned_pages = match limit {
            Limit::Pages(pages) => pages,
            Limit::Results(results) => results.div_ceil(rpp),
        };
        let last_planned_page = start
            .saturating_add(planned_pages.saturating_sub(1))
            .min(ceiling)
            .max(start);

        Ok(Self {
            builder,
            policy,
            total_requested: limit.total_requested(rpp),
            total_collected: 0,
            current: first,
            last_planned_page,
            page_limit,
            ceiling,
            consecutive_empty: 0,
            consecutive_aborts: 0,
        })
    }

    /// The query for the page being processed.
    #[must_use]
    pub fn current(&self) -> &SearchQuery {
        &self.current
    }

    /// Counters as they stand.
    #[must_use]
    pub fn state(&self) -> PaginationState {
        PaginationState {
            term: self.current.term().to_string(),
            total_requested: self.total_requested,
            total_collected: self.total_collected,
            current_page: self.current.page(),
        }
    }

    /// Records an extracted page with `organic_count` organic results.
    pub fn on_page(&mut self, organic_count: usize) -> PaginationDecision {
        self.total_collected += organic_count as u64;
        self.consecutive_aborts = 0;

        if self.total_collected >= self.total_requested {
            return PaginationDecision::Done(StopReason::Satisfied);
        }
        if organic_count == 0 {
            self.consecutive_empty += 1;
            if self.policy.stop_on_first_empty {
                return PaginationDecision::Done(StopReason::EmptyPage);
            }
            if self.consecutive_empty >= self.policy.max_consecutive_empty {
                return PaginationDecision::Done(StopReason::ConsecutiveEmptyPages);
            }
        } else {
            self.consecutive_empty = 0;
        }
        self.advance()
    }

    /// Records an aborted page.
    pub fn on_abort(&mut self) -> PaginationDecision {
        self.consecutive_aborts += 1;
        if self
            .policy
            .max_consecutive_aborts
            .is_some_and(|max| self.consecutive_aborts >= max)
        {
            return PaginationDecision::Done(StopReason::ConsecutiveAborts);
        }
        self.advance()
    }

    /// Queries from the current page up to the last planned page.
    ///
    /// Used to report pages skipped by cancellation.
    #[must_use]
    pub fn remaining_planned(&self) -> Vec<SearchQuery> {
        (self.current.page()..=self.last_planned_page)
            .map(|page| self.builder.at_page(&self.current, page))
            .collect()
    }

    fn advance(&mut self) -> PaginationDecision {
        let next = self.current.page().saturating_add(1);
        if self.page_limit.is_some_and(|limit| next > limit) {
            return PaginationDecision::Done(StopReason::PageLimit);
        }
        if next > self.ceiling {
            return PaginationDecision::Done(StopReason::Ceiling);
        }
        self.current = self.builder.next_page(&self.current);
        self.last_planned_page = self.last_planned_page.max(self.current.page());
        PaginationDecision::Continue(self.current.clone())
    }
}
