//! Builds [`SearchQuery`] values from user input.
//!
//! Building is pure: the same parameters always produce the same URL, byte for
//! byte. Parameters are always emitted in the order `q`, `mkt`, `setLang`,
//! `count`, `first`.

use url::form_urlencoded;
use url::Url;

use crate::core::SearchQuery;
use crate::errors::ConfigurationError;

/// Default search endpoint.
pub const BING_SEARCH_URL: &str = "https://www.bing.com/search";

/// Smallest page size the engine accepts.
pub const MIN_RESULTS_PER_PAGE: u32 = 1;

/// Largest page size the engine accepts.
pub const MAX_RESULTS_PER_PAGE: u32 = 50;

/// Most results Bing serves for a single query.
pub const MAX_RESULTS_PER_QUERY: u32 = 2000;

/// Highest page number worth requesting at a page size.
#[must_use]
pub fn page_ceiling(results_per_page: u32) -> u32 {
    MAX_RESULTS_PER_QUERY.div_ceil(results_per_page.max(1))
}

/// The `first` offset for a page, saturating instead of overflowing.
#[must_use]
pub fn first_offset(page: u32, results_per_page: u32) -> u32 {
    page.saturating_sub(1)
        .saturating_mul(results_per_page)
        .saturating_add(1)
}

/// Raw parameters for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// A keyword, or a full search URL.
    pub term_or_url: String,
    /// Market code, e.g. `en-US`.
    pub market_code: String,
    /// Interface language, e.g. `en`.
    pub language_code: String,
    /// Requested page size; clamped to the supported range.
    pub results_per_page: u32,
    /// 1-based page to start from.
    pub page: u32,
}

impl QueryParams {
    /// Creates parameters for page 1.
    #[must_use]
    pub fn new(
        term_or_url: impl Into<String>,
        market_code: impl Into<String>,
        language_code: impl Into<String>,
        results_per_page: u32,
    ) -> Self {
        Self {
            term_or_url: term_or_url.into(),
            market_code: market_code.into(),
            language_code: language_code.into(),
            results_per_page,
            page: 1,
        }
    }

    /// Sets the starting page.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// Clamps a page size to the supported range.
#[must_use]
pub fn clamp_results_per_page(requested: u32) -> u32 {
    requested.clamp(MIN_RESULTS_PER_PAGE, MAX_RESULTS_PER_PAGE)
}

/// Turns [`QueryParams`] into request-ready [`SearchQuery`] values.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Creates a builder targeting the public Bing endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: BING_SEARCH_URL.to_string(),
        }
    }

    /// Targets a different endpoint (useful against a local mirror).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validates the parameters and builds the query.
    pub fn build(&self, params: &QueryParams) -> Result<SearchQuery, ConfigurationError> {
        let input = params.term_or_url.trim();
        if input.is_empty() {
            return Err(ConfigurationError::Empty { field: "term" });
        }
        if params.page == 0 {
            return Err(ConfigurationError::InvalidPage(params.page));
        }

        let mut resolved = Resolved {
            term: input.to_string(),
            market_code: params.market_code.trim().to_string(),
            language_code: params.language_code.trim().to_string(),
            results_per_page: params.results_per_page,
        };
        if is_url(input) {
            resolved = resolve_url_input(input, resolved)?;
        }

        if resolved.market_code.is_empty() {
            return Err(ConfigurationError::Empty { field: "marketCode" });
        }
        if resolved.language_code.is_empty() {
            return Err(ConfigurationError::Empty { field: "languageCode" });
        }

        let results_per_page = clamp_results_per_page(resolved.results_per_page);
        let ceiling = page_ceiling(results_per_page);
        if params.page > ceiling {
            return Err(ConfigurationError::PageBeyondCeiling {
                page: params.page,
                ceiling,
            });
        }

        Ok(self.assemble(
            resolved.term,
            resolved.market_code,
            resolved.language_code,
            results_per_page,
            params.page,
        ))
    }

    /// Derives the query for the following page.
    #[must_use]
    pub fn next_page(&self, query: &SearchQuery) -> SearchQuery {
        self.at_page(query, query.page() + 1)
    }

    /// Derives the same query at another page.
    #[must_use]
    pub fn at_page(&self, query: &SearchQuery, page: u32) -> SearchQuery {
        self.assemble(
            query.term().to_string(),
            query.market_code().to_string(),
            query.language_code().to_string(),
            query.results_per_page(),
            page.max(1),
        )
    }

    fn assemble(
        &self,
        term: String,
        market_code: String,
        language_code: String,
        results_per_page: u32,
        page: u32,
    ) -> SearchQuery {
        let first = first_offset(page, results_per_page);
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &term)
            .append_pair("mkt", &market_code)
            .append_pair("setLang", &language_code)
            .append_pair("count", &results_per_page.to_string())
            .append_pair("first", &first.to_string())
            .finish();
        let url = format!("{}?{}", self.base_url, encoded);

        SearchQuery::new(term, results_per_page, page, url, market_code, language_code)
    }
}

/// Headers every request carries regardless of retry state.
#[must_use]
pub fn base_headers(query: &SearchQuery) -> Vec<(String, String)> {
    vec![
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), query.language_code().to_string()),
    ]
}

struct Resolved {
    term: String,
    market_code: String,
    language_code: String,
    results_per_page: u32,
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Pulls term, market, language and page size out of a search URL.
fn resolve_url_input(input: &str, mut resolved: Resolved) -> Result<Resolved, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
    let host = url.host_str().unwrap_or_default();
    if !(host == "bing.com" || host.ends_with(".bing.com")) {
        return Err(invalid("not a bing.com host"));
    }

    let mut term = None;
    for (key, value) in url.query_pairs() {
        match key.to_ascii_lowercase().as_str() {
            "q" => term = Some(value.trim().to_string()),
            "mkt" if !value.trim().is_empty() => resolved.market_code = value.trim().to_string(),
            "setlang" if !value.trim().is_empty() => {
                resolved.language_code = value.trim().to_string();
            }
            "count" => {
                if let Ok(count) = value.parse::<u32>() {
                    resolved.results_per_page = count;
                }
            }
            _ => {}
        }
    }

    resolved.term = term
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid("missing q parameter"))?;
    Ok(resolved)
}
