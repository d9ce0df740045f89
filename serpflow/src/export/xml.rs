//! XML output: one `<page>` element per record.
//!
//! ```text
//! <searchResults>
//!   <page>
//!     <term>..</term> <resultsPerPage>..</resultsPerPage> <page>..</page> ...
//!     <organicResults><item><title>..</title>...</item></organicResults>
//!     <paidResults/> <peopleAlsoAsk/> <relatedQueries/>
//!   </page>
//! </searchResults>
//! ```

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::io::Write;

use crate::core::SearchRecord;
use crate::errors::SerpResult;

const QUERY_FIELDS: &[&str] = &[
    "term",
    "resultsPerPage",
    "page",
    "url",
    "marketCode",
    "languageCode",
];

const ITEM_SECTIONS: &[&str] = &["organicResults", "paidResults", "peopleAlsoAsk", "relatedQueries"];

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn write_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> std::io::Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))
}

fn write_page<W: Write>(xml: &mut Writer<W>, record: &Value) -> std::io::Result<()> {
    xml.write_event(Event::Start(BytesStart::new("page")))?;

    let query = &record["searchQuery"];
    for field in QUERY_FIELDS {
        if let Some(value) = query.get(*field).filter(|v| !v.is_null()) {
            write_element(xml, field, &text_of(value))?;
        }
    }

    for section in ITEM_SECTIONS {
        xml.write_event(Event::Start(BytesStart::new(*section)))?;
        let items = record[*section].as_array().map(Vec::as_slice).unwrap_or_default();
        for item in items {
            xml.write_event(Event::Start(BytesStart::new("item")))?;
            if let Some(fields) = item.as_object() {
                for (key, value) in fields {
                    write_element(xml, key, &text_of(value))?;
                }
            }
            xml.write_event(Event::End(BytesEnd::new("item")))?;
        }
        xml.write_event(Event::End(BytesEnd::new(*section)))?;
    }

    xml.write_event(Event::End(BytesEnd::new("page")))
}

/// Writes records as an indented XML document.
pub fn write_xml<W: Write>(writer: W, records: &[SearchRecord]) -> SerpResult<()> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.write_event(Event::Start(BytesStart::new("searchResults")))?;
    for record in records {
        write_page(&mut xml, &serde_json::to_value(record)?)?;
    }
    xml.write_event(Event::End(BytesEnd::new("searchResults")))?;
    xml.into_inner().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ResultExtractor;
    use crate::query::{QueryBuilder, QueryParams};
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;
    use quick_xml::Reader;

    fn record() -> SearchRecord {
        let query = QueryBuilder::new()
            .build(&QueryParams::new("apify", "en-US", "en", 10))
            .unwrap();
        ResultExtractor::default()
            .extract_html(&query, fixtures::APIFY_SERP)
            .record
    }

    /// Collects (element name, text) pairs in document order.
    fn texts(xml: &str) -> Vec<(String, String)> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut open = Vec::new();
        let mut out = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => open.push(String::from_utf8(e.name().as_ref().to_vec()).unwrap()),
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(t) => {
                    let name = open.last().cloned().unwrap_or_default();
                    out.push((name, t.unescape().unwrap().into_owned()));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_xml_layout() {
        let record = record();
        let mut buf = Vec::new();
        write_xml(&mut buf, &[record.clone()]).unwrap();
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<searchResults>"));
        assert_eq!(xml.matches("<page>").count(), 1);
        assert_eq!(xml.matches("<item>").count(), 16);

        let texts = texts(&xml);
        assert_eq!(texts[0], ("term".to_string(), "apify".to_string()));
        assert!(texts.contains(&("marketCode".to_string(), "en-US".to_string())));
        assert!(texts.contains(&("title".to_string(), record.organic_results[0].title.clone())));
    }

    #[test]
    fn test_xml_escapes_text() {
        let mut record = record();
        record.organic_results[0].title = "Tom & Jerry <3".to_string();
        let mut buf = Vec::new();
        write_xml(&mut buf, &[record]).unwrap();
        let xml = String::from_utf8(buf).unwrap();

        assert!(xml.contains("Tom &amp; Jerry &lt;3"));
        assert!(texts(&xml).contains(&("title".to_string(), "Tom & Jerry <3".to_string())));
    }

    #[test]
    fn test_xml_without_records() {
        let mut buf = Vec::new();
        write_xml(&mut buf, &[]).unwrap();
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains("<searchResults>"));
        assert!(!xml.contains("<page>"));
    }
}
