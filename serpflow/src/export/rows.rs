//! Row-level view of records for tabular writers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

use crate::core::SearchRecord;
use crate::errors::SerpResult;

/// Which region a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    /// Organic listing.
    Organic,
    /// Ad.
    Ad,
    /// People-also-ask pair.
    PeopleAlsoAsk,
    /// Related search.
    RelatedQuery,
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organic => write!(f, "organic"),
            Self::Ad => write!(f, "ad"),
            Self::PeopleAlsoAsk => write!(f, "people_also_ask"),
            Self::RelatedQuery => write!(f, "related_query"),
        }
    }
}

/// One result item with its query context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRow {
    /// Search term.
    pub search_term: String,
    /// Page number.
    pub page: u32,
    /// Market code.
    pub market_code: String,
    /// Language code.
    pub language_code: String,
    /// Region the item came from.
    pub result_type: RowType,
    /// 1-based position within its region on the page.
    pub position: u32,
    /// Title, question, or suggestion text.
    pub title: String,
    /// Target URL.
    pub url: Option<String>,
    /// Displayed URL.
    pub displayed_url: Option<String>,
    /// Snippet or answer.
    pub description: Option<String>,
    /// Favicon URL.
    pub icon_url: Option<String>,
    /// Emphasized keywords joined with `", "`.
    pub emphasized_keywords: Option<String>,
}

struct RowContext<'a> {
    record: &'a SearchRecord,
}

impl RowContext<'_> {
    fn row(&self, result_type: RowType, position: u32, title: &str) -> FlatRow {
        let query = &self.record.search_query;
        FlatRow {
            search_term: query.term().to_string(),
            page: query.page(),
            market_code: query.market_code().to_string(),
            language_code: query.language_code().to_string(),
            result_type,
            position,
            title: title.to_string(),
            url: None,
            displayed_url: None,
            description: None,
            icon_url: None,
            emphasized_keywords: None,
        }
    }
}

fn joined(keywords: &[String]) -> Option<String> {
    (!keywords.is_empty()).then(|| keywords.join(", "))
}

fn position(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Flattens records into rows: organic, then ads, then people-also-ask, then
/// related searches, record by record.
#[must_use]
pub fn flatten_records(records: &[SearchRecord]) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for record in records {
        let ctx = RowContext { record };

        rows.extend(record.organic_results.iter().map(|item| FlatRow {
            url: Some(item.url.clone()),
            displayed_url: Some(item.displayed_url.clone()),
            description: Some(item.description.clone()),
            icon_url: item.icon_url.clone(),
            emphasized_keywords: joined(&item.emphasized_keywords),
            ..ctx.row(RowType::Organic, item.position, &item.title)
        }));

        rows.extend(record.paid_results.iter().map(|item| FlatRow {
            url: Some(item.url.clone()),
            displayed_url: Some(item.displayed_url.clone()),
            description: Some(item.description.clone()),
            icon_url: item.icon_url.clone(),
            emphasized_keywords: joined(&item.emphasized_keywords),
            ..ctx.row(RowType::Ad, item.position, &item.title)
        }));

        rows.extend(
            record
                .people_also_ask
                .iter()
                .enumerate()
                .map(|(i, item)| FlatRow {
                    url: item.url.clone(),
                    description: item.answer.clone(),
                    ..ctx.row(RowType::PeopleAlsoAsk, position(i), &item.question)
                }),
        );

        rows.extend(
            record
                .related_queries
                .iter()
                .enumerate()
                .map(|(i, item)| FlatRow {
                    url: Some(item.url.clone()),
                    ..ctx.row(RowType::RelatedQuery, position(i), &item.title)
                }),
        );
    }
    rows
}

/// Writes rows as newline-delimited JSON.
pub fn write_json_lines<W: Write>(mut writer: W, rows: &[FlatRow]) -> SerpResult<()> {
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ResultExtractor;
    use crate::query::{QueryBuilder, QueryParams};
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    fn records() -> Vec<SearchRecord> {
        let query = QueryBuilder::new()
            .build(&QueryParams::new("apify", "en-US", "en", 10))
            .unwrap();
        vec![
            ResultExtractor::default()
                .extract_html(&query, fixtures::APIFY_SERP)
                .record,
        ]
    }

    #[test]
    fn test_one_row_per_item() {
        let rows = flatten_records(&records());
        let count = |t: RowType| rows.iter().filter(|r| r.result_type == t).count();

        assert_eq!(rows.len(), 16);
        assert_eq!(count(RowType::Organic), 10);
        assert_eq!(count(RowType::Ad), 1);
        assert_eq!(count(RowType::PeopleAlsoAsk), 2);
        assert_eq!(count(RowType::RelatedQuery), 3);
    }

    #[test]
    fn test_rows_carry_query_context() {
        let rows = flatten_records(&records());

        let first = &rows[0];
        assert_eq!(first.search_term, "apify");
        assert_eq!(first.page, 1);
        assert_eq!(first.market_code, "en-US");
        assert_eq!(first.result_type, RowType::Organic);
        assert_eq!(first.emphasized_keywords.as_deref(), Some("Apify"));

        let paa = rows
            .iter()
            .find(|r| r.result_type == RowType::PeopleAlsoAsk)
            .unwrap();
        assert_eq!(paa.position, 1);
        assert_eq!(paa.title, "What is Apify used for?");
        assert!(paa.displayed_url.is_none());
    }

    #[test]
    fn test_json_lines() {
        let rows = flatten_records(&records());
        let mut buf = Vec::new();
        write_json_lines(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text.lines().count(), rows.len());
        let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(last["resultType"], "related_query");
        assert_eq!(RowType::PeopleAlsoAsk.to_string(), "people_also_ask");
    }
}
