//! Typed records produced by the extraction pipeline.
//!
//! Field names serialize in camelCase; the JSON shape of [`SearchRecord`] is a
//! compatibility contract with downstream consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One page request against the search engine.
///
/// Queries are immutable: the next page or a retry variant is always a new
/// value derived through [`crate::query::QueryBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    term: String,
    results_per_page: u32,
    page: u32,
    url: String,
    market_code: String,
    language_code: String,
}

impl SearchQuery {
    pub(crate) fn new(
        term: String,
        results_per_page: u32,
        page: u32,
        url: String,
        market_code: String,
        language_code: String,
    ) -> Self {
        Self {
            term,
            results_per_page,
            page,
            url,
            market_code,
            language_code,
        }
    }

    /// The search term.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Results requested per page (already clamped).
    #[must_use]
    pub fn results_per_page(&self) -> u32 {
        self.results_per_page
    }

    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Fully assembled request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Market code, e.g. `en-US`.
    #[must_use]
    pub fn market_code(&self) -> &str {
        &self.market_code
    }

    /// Interface language, e.g. `en`.
    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    /// The `first` offset sent to the engine.
    #[must_use]
    pub fn offset(&self) -> u32 {
        crate::query::first_offset(self.page, self.results_per_page)
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' page {} ({})", self.term, self.page, self.market_code)
    }
}

/// Marker distinguishing organic listings from ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// A regular listing.
    #[default]
    Organic,
    /// A paid placement.
    Ad,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organic => write!(f, "organic"),
            Self::Ad => write!(f, "ad"),
        }
    }
}

/// An organic listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganicResult {
    /// 1-based position within the page.
    pub position: u32,
    /// Listing title.
    pub title: String,
    /// Target URL.
    pub url: String,
    /// URL as displayed under the title.
    pub displayed_url: String,
    /// Snippet text.
    pub description: String,
    /// Favicon URL, if shown.
    pub icon_url: Option<String>,
    /// Bold keywords from the snippet, in first-seen order.
    pub emphasized_keywords: Vec<String>,
    /// Always [`ResultKind::Organic`].
    #[serde(rename = "type")]
    pub kind: ResultKind,
}

/// A paid listing. Same shape as [`OrganicResult`] with an ad marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidResult {
    /// 1-based position among the ads of the page.
    pub position: u32,
    /// Ad title.
    pub title: String,
    /// Target URL.
    pub url: String,
    /// URL as displayed under the title.
    pub displayed_url: String,
    /// Ad copy.
    pub description: String,
    /// Favicon URL, if shown.
    pub icon_url: Option<String>,
    /// Bold keywords from the ad copy.
    pub emphasized_keywords: Vec<String>,
    /// Always [`ResultKind::Ad`].
    #[serde(rename = "type")]
    pub kind: ResultKind,
}

impl Default for PaidResult {
    fn default() -> Self {
        Self {
            position: 0,
            title: String::new(),
            url: String::new(),
            displayed_url: String::new(),
            description: String::new(),
            icon_url: None,
            emphasized_keywords: Vec::new(),
            kind: ResultKind::Ad,
        }
    }
}

/// A "people also ask" question with its inline answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaPair {
    /// The question text.
    pub question: String,
    /// The answer snippet.
    pub answer: Option<String>,
    /// Source URL of the answer.
    pub url: Option<String>,
}

/// A related search suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedQuery {
    /// Suggestion text.
    pub title: String,
    /// Absolute search URL for the suggestion.
    pub url: String,
}

/// Everything extracted from one successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    /// The query that produced this page.
    pub search_query: SearchQuery,
    /// Result count estimate from the page header. Never bounds extraction.
    pub results_total: u64,
    /// Organic listings, positions `1..=N`.
    pub organic_results: Vec<OrganicResult>,
    /// Ads.
    pub paid_results: Vec<PaidResult>,
    /// People-also-ask pairs.
    pub people_also_ask: Vec<QaPair>,
    /// Related searches.
    pub related_queries: Vec<RelatedQuery>,
    /// Raw HTML when retention was requested.
    pub html: Option<String>,
    /// Location of the stored snapshot when one was written.
    pub html_snapshot_url: Option<String>,
}

impl SearchRecord {
    /// Creates an empty record for a query.
    #[must_use]
    pub fn empty(search_query: SearchQuery) -> Self {
        Self {
            search_query,
            results_total: 0,
            organic_results: Vec::new(),
            paid_results: Vec::new(),
            people_also_ask: Vec::new(),
            related_queries: Vec::new(),
            html: None,
            html_snapshot_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query() -> SearchQuery {
        SearchQuery::new(
            "apify".to_string(),
            10,
            3,
            "https://www.bing.com/search?q=apify".to_string(),
            "en-US".to_string(),
            "en".to_string(),
        )
    }

    #[test]
    fn test_query_offset() {
        assert_eq!(query().offset(), 21);
    }

    #[test]
    fn test_record_json_shape() {
        let record = SearchRecord::empty(query());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "searchQuery": {
                    "term": "apify",
                    "resultsPerPage": 10,
                    "page": 3,
                    "url": "https://www.bing.com/search?q=apify",
                    "marketCode": "en-US",
                    "languageCode": "en"
                },
                "resultsTotal": 0,
                "organicResults": [],
                "paidResults": [],
                "peopleAlsoAsk": [],
                "relatedQueries": [],
                "html": null,
                "htmlSnapshotUrl": null
            })
        );
    }

    #[test]
    fn test_result_type_marker() {
        let organic = serde_json::to_value(OrganicResult::default()).unwrap();
        let paid = serde_json::to_value(PaidResult::default()).unwrap();

        assert_eq!(organic["type"], "organic");
        assert_eq!(paid["type"], "ad");
        assert!(organic["iconUrl"].is_null());
        assert!(organic["emphasizedKeywords"].is_array());
    }
}
