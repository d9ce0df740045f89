//! Per-query input items and their merge with run settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::settings::ScraperSettings;
use crate::errors::{ConfigurationError, SerpResult};
use crate::orchestrator::SearchJob;
use crate::pagination::Limit;
use crate::query::{QueryBuilder, QueryParams};

/// One query as supplied by the caller. Unset fields fall back to
/// [`ScraperSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    /// Keyword to search for.
    #[serde(default, alias = "query")]
    pub term: Option<String>,
    /// Full search URL; used instead of `term` when both are set.
    #[serde(default)]
    pub url: Option<String>,
    /// Market override.
    #[serde(default)]
    pub market_code: Option<String>,
    /// Language override.
    #[serde(default)]
    pub language_code: Option<String>,
    /// Page size override.
    #[serde(default)]
    pub results_per_page: Option<u32>,
    /// Page limit.
    #[serde(default, alias = "pages")]
    pub max_pages: Option<u32>,
    /// Organic result limit.
    #[serde(default)]
    pub max_results: Option<u32>,
    /// 1-based page to start from.
    #[serde(default)]
    pub start_page: Option<u32>,
}

impl SearchInput {
    /// A keyword input.
    #[must_use]
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            ..Self::default()
        }
    }

    /// A URL input.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Limits the job to a number of pages.
    #[must_use]
    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Limits the job to a number of organic results.
    #[must_use]
    pub fn with_max_results(mut self, results: u32) -> Self {
        self.max_results = Some(results);
        self
    }

    /// Overrides the page size.
    #[must_use]
    pub fn with_results_per_page(mut self, results_per_page: u32) -> Self {
        self.results_per_page = Some(results_per_page);
        self
    }

    /// Overrides the market.
    #[must_use]
    pub fn with_market_code(mut self, market_code: impl Into<String>) -> Self {
        self.market_code = Some(market_code.into());
        self
    }

    fn term_or_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.term.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    fn label(&self) -> String {
        self.term_or_url().unwrap_or_default().to_string()
    }

    /// The pagination limit after merging with settings.
    pub fn limit(&self, settings: &ScraperSettings) -> Result<Limit, ConfigurationError> {
        let limit = match (self.max_pages, self.max_results) {
            (Some(_), Some(_)) => return Err(ConfigurationError::ConflictingLimits(self.label())),
            (None, Some(results)) => Limit::Results(results),
            (Some(pages), None) => Limit::Pages(pages),
            (None, None) => Limit::Pages(settings.pages),
        };
        limit.validate()?;
        Ok(limit)
    }

    /// Merges with settings into query parameters. `index` is the item's
    /// position in the input list, used in error messages.
    pub fn params(
        &self,
        index: usize,
        settings: &ScraperSettings,
    ) -> Result<QueryParams, ConfigurationError> {
        let term_or_url = self
            .term_or_url()
            .ok_or(ConfigurationError::MissingTerm(index))?;
        let params = QueryParams::new(
            term_or_url,
            self.market_code.as_deref().unwrap_or(&settings.market_code),
            self.language_code
                .as_deref()
                .unwrap_or(&settings.language_code),
            self.results_per_page.unwrap_or(settings.results_per_page),
        );
        Ok(params.with_page(self.start_page.unwrap_or(1)))
    }

    /// Resolves this item into a job.
    pub fn to_job(
        &self,
        index: usize,
        settings: &ScraperSettings,
        builder: &QueryBuilder,
    ) -> Result<SearchJob, ConfigurationError> {
        let limit = self.limit(settings)?;
        SearchJob::from_params(builder, &self.params(index, settings)?, limit)
    }
}

/// An inputs document: `{"queries": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Query items in run order.
    #[serde(default)]
    pub queries: Vec<SearchInput>,
}

impl InputFile {
    /// Parses an inputs document.
    pub fn from_json_str(json: &str) -> SerpResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses an inputs file.
    pub fn from_file(path: impl AsRef<Path>) -> SerpResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Resolves every input into a job, keeping input order.
///
/// The first invalid item rejects the whole batch, before anything is fetched.
pub fn resolve(
    settings: &ScraperSettings,
    inputs: &[SearchInput],
    builder: &QueryBuilder,
) -> Result<Vec<SearchJob>, ConfigurationError> {
    if inputs.is_empty() {
        return Err(ConfigurationError::Empty { field: "queries" });
    }
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| input.to_job(index, settings, builder))
        .collect()
}
