//! Turns an `Ok` result page into a [`SearchRecord`].

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

use super::locator::{FieldLocator, SelectorLocator};
use super::text::{
    absolutize, element_text, element_text_spaced, number_group_pattern, parse_results_total,
};
use crate::core::{OrganicResult, PaidResult, QaPair, RelatedQuery, SearchQuery, SearchRecord};
use crate::errors::ExtractionInconsistency;

/// A record plus the inconsistency found while building it, if any.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Everything that could be extracted.
    pub record: SearchRecord,
    /// Set when the organic container was missing.
    pub inconsistency: Option<ExtractionInconsistency>,
}

/// Common shape of an organic or paid listing before it is typed.
struct Listing {
    position: u32,
    title: String,
    url: String,
    displayed_url: String,
    description: String,
    icon_url: Option<String>,
    emphasized_keywords: Vec<String>,
}

/// Extracts organic results, ads, people-also-ask and related searches.
///
/// Never fails outright: missing fields and regions come back empty, and a
/// missing organic container is reported through
/// [`ExtractionOutcome::inconsistency`].
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    organic: Arc<dyn FieldLocator>,
    paid: Arc<dyn FieldLocator>,
    results_container: Selector,
    results_total: Selector,
    paa_block: Selector,
    paa_qa: Selector,
    paa_question: Selector,
    paa_answer: Selector,
    paa_link: Selector,
    related_link: Selector,
    number: Regex,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selector must parse")
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self::new(
            Arc::new(SelectorLocator::organic()),
            Arc::new(SelectorLocator::paid()),
        )
    }
}

impl ResultExtractor {
    /// Creates an extractor with custom locators.
    #[must_use]
    pub fn new(organic: Arc<dyn FieldLocator>, paid: Arc<dyn FieldLocator>) -> Self {
        Self {
            organic,
            paid,
            results_container: selector("#b_results"),
            results_total: selector("#b_tween .sb_count, .sb_count"),
            paa_block: selector("#b_context .b_expando, #b_results .b_expando"),
            paa_qa: selector("div.b_qa"),
            paa_question: selector("div.b_q"),
            paa_answer: selector("div.b_a"),
            paa_link: selector("a[href]"),
            related_link: selector("#b_context .b_rs li a[href]"),
            number: number_group_pattern(),
        }
    }

    /// Parses and extracts a page body.
    #[must_use]
    pub fn extract_html(&self, query: &SearchQuery, body: &str) -> ExtractionOutcome {
        let document = Html::parse_document(body);
        self.extract(query, &document)
    }

    /// Extracts a parsed page.
    #[must_use]
    pub fn extract(&self, query: &SearchQuery, document: &Html) -> ExtractionOutcome {
        let mut record = SearchRecord::empty(query.clone());

        let inconsistency = if document.select(&self.results_container).next().is_none() {
            Some(ExtractionInconsistency::new(
                query.url(),
                "organic results container #b_results not found",
            ))
        } else {
            None
        };

        record.results_total = document
            .select(&self.results_total)
            .next()
            .map_or(0, |el| parse_results_total(&self.number, &element_text(el)));

        record.organic_results = self
            .listings(self.organic.as_ref(), document)
            .into_iter()
            .map(|l| OrganicResult {
                position: l.position,
                title: l.title,
                url: l.url,
                displayed_url: l.displayed_url,
                description: l.description,
                icon_url: l.icon_url,
                emphasized_keywords: l.emphasized_keywords,
                kind: self.organic.kind(),
            })
            .collect();

        record.paid_results = self
            .listings(self.paid.as_ref(), document)
            .into_iter()
            .map(|l| PaidResult {
                position: l.position,
                title: l.title,
                url: l.url,
                displayed_url: l.displayed_url,
                description: l.description,
                icon_url: l.icon_url,
                emphasized_keywords: l.emphasized_keywords,
                kind: self.paid.kind(),
            })
            .collect();

        record.people_also_ask = self.people_also_ask(document);
        record.related_queries = self.related_queries(document);

        ExtractionOutcome {
            record,
            inconsistency,
        }
    }

    fn listings(&self, locator: &dyn FieldLocator, document: &Html) -> Vec<Listing> {
        let mut position = 0;
        locator
            .items(document)
            .into_iter()
            .filter_map(|item| {
                let (title, url) = locator.title_and_url(item)?;
                position += 1;
                Some(Listing {
                    position,
                    displayed_url: locator.displayed_url(item).unwrap_or_else(|| url.clone()),
                    description: locator.description(item),
                    icon_url: locator.icon_url(item),
                    emphasized_keywords: locator.emphasized_keywords(item),
                    title,
                    url,
                })
            })
            .collect()
    }

    fn people_also_ask(&self, document: &Html) -> Vec<QaPair> {
        document
            .select(&self.paa_block)
            .filter_map(|block| {
                let qa = block.select(&self.paa_qa).next()?;
                let question = first_text(qa, &self.paa_question)?;
                Some(QaPair {
                    question,
                    answer: first_text(qa, &self.paa_answer),
                    url: qa
                        .select(&self.paa_link)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .and_then(absolutize),
                })
            })
            .collect()
    }

    fn related_queries(&self, document: &Html) -> Vec<RelatedQuery> {
        document
            .select(&self.related_link)
            .filter_map(|link| {
                let title = element_text_spaced(link);
                if title.is_empty() {
                    return None;
                }
                let url = link.value().attr("href").and_then(absolutize)?;
                Some(RelatedQuery { title, url })
            })
            .collect()
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text_spaced)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultKind;
    use crate::query::{QueryBuilder, QueryParams};
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    fn query() -> SearchQuery {
        QueryBuilder::new()
            .build(&QueryParams::new("apify", "en-US", "en", 10))
            .unwrap()
    }

    #[test]
    fn test_extract_apify_page() {
        let outcome = ResultExtractor::default().extract_html(&query(), fixtures::APIFY_SERP);
        let record = outcome.record;

        assert!(outcome.inconsistency.is_none());
        assert_eq!(record.results_total, 30_100);
        assert_eq!(record.organic_results.len(), 10);
        assert_eq!(record.paid_results.len(), 1);
        assert_eq!(record.people_also_ask.len(), 2);
        assert_eq!(record.related_queries.len(), 3);
        assert!(record.html.is_none());

        let first = &record.organic_results[0];
        assert_eq!(first.title, "Apify: Full-stack web scraping and data extraction platform");
        assert_eq!(first.url, "https://apify.com/");
        assert_eq!(first.displayed_url, "https://apify.com");
        assert_eq!(first.kind, ResultKind::Organic);
        assert_eq!(first.emphasized_keywords, vec!["Apify".to_string()]);
    }

    #[test]
    fn test_positions_are_contiguous() {
        let record = ResultExtractor::default()
            .extract_html(&query(), fixtures::APIFY_SERP)
            .record;
        let positions: Vec<u32> = record.organic_results.iter().map(|r| r.position).collect();

        assert_eq!(positions, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_ads_paa_related() {
        let record = ResultExtractor::default()
            .extract_html(&query(), fixtures::APIFY_SERP)
            .record;

        let ad = &record.paid_results[0];
        assert_eq!(ad.kind, ResultKind::Ad);
        assert_eq!(ad.position, 1);
        assert_eq!(ad.displayed_url, "apify.com/pricing");

        let paa = &record.people_also_ask[0];
        assert_eq!(paa.question, "What is Apify used for?");
        assert!(paa.answer.as_deref().unwrap_or("").starts_with("Apify is used"));
        assert_eq!(paa.url.as_deref(), Some("https://docs.apify.com/"));

        assert_eq!(record.related_queries[0].title, "apify pricing");
        assert_eq!(
            record.related_queries[0].url,
            "https://www.bing.com/search?q=apify+pricing"
        );
    }

    #[test]
    fn test_untitled_items_do_not_take_positions() {
        let html = r#"<html><body><ol id="b_results">
            <li class="b_algo"><h2>no link</h2></li>
            <li class="b_algo"><h2><a href="https://a.example/">A</a></h2></li>
            <li class="b_algo"><h2><a href="https://b.example/">B</a></h2></li>
        </ol></body></html>"#;
        let record = ResultExtractor::default().extract_html(&query(), html).record;

        assert_eq!(record.organic_results.len(), 2);
        assert_eq!(record.organic_results[0].position, 1);
        assert_eq!(record.organic_results[0].displayed_url, "https://a.example/");
        assert_eq!(record.organic_results[1].position, 2);
    }

    #[test]
    fn test_missing_container_is_inconsistent_but_partial() {
        let html = r#"<html><body><div id="b_content">
            <span class="sb_count">About 12 results</span>
            <div id="b_context"><div class="b_rs"><ul><li><a href="/search?q=x">x</a></li></ul></div></div>
        </div></body></html>"#;
        let outcome = ResultExtractor::default().extract_html(&query(), html);

        assert!(outcome.inconsistency.is_some());
        assert_eq!(outcome.record.results_total, 12);
        assert!(outcome.record.organic_results.is_empty());
        assert_eq!(outcome.record.related_queries.len(), 1);
    }

    #[test]
    fn test_related_searches_only_from_sidebar() {
        let html = r#"<html><body><div id="b_content">
            <ol id="b_results">
              <li class="b_algo"><h2><a href="https://a.example/">A</a></h2></li>
              <li class="b_ans"><div class="b_rs"><ul><li><a href="/search?q=inline">inline</a></li></ul></div></li>
            </ol>
            <div id="b_context"><div class="b_rs"><ul><li><a href="/search?q=side">side</a></li></ul></div></div>
        </div></body></html>"#;
        let record = ResultExtractor::default().extract_html(&query(), html).record;

        let titles: Vec<&str> = record.related_queries.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["side"]);
    }

    #[test]
    fn test_missing_total_is_zero() {
        let record = ResultExtractor::default()
            .extract_html(&query(), fixtures::NO_RESULTS_PAGE)
            .record;
        assert_eq!(record.results_total, 0);
        assert!(record.organic_results.is_empty());
    }
}
