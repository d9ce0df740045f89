//! Text and URL helpers shared by the locators.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

/// Base used to resolve relative links on result pages.
pub const BING_ORIGIN: &str = "https://www.bing.com/";

/// Concatenated text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    collapse_whitespace(&raw)
}

/// Text of an element with a space between text nodes, whitespace collapsed.
pub fn element_text_spaced(element: ElementRef<'_>) -> String {
    let raw = element.text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&raw)
}

/// Collapses runs of whitespace and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a possibly relative href against the Bing origin.
pub fn absolutize(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(BING_ORIGIN).ok()?;
    base.join(href).ok().map(String::from)
}

/// Unwraps a Bing click-tracking link (`/ck/a?...&u=a1<base64url>`).
///
/// Anything that is not a decodable tracking link is returned unchanged.
pub fn decode_bing_redirect(href: &str) -> String {
    let Some(absolute) = absolutize(href) else {
        return href.to_string();
    };
    let Ok(url) = Url::parse(&absolute) else {
        return href.to_string();
    };
    let on_bing = url
        .host_str()
        .is_some_and(|h| h == "bing.com" || h.ends_with(".bing.com"));
    if !on_bing || url.path() != "/ck/a" {
        return absolute;
    }

    url.query_pairs()
        .find(|(key, _)| key == "u")
        .and_then(|(_, value)| {
            let encoded = value.strip_prefix("a1")?.trim_end_matches('=');
            let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
            String::from_utf8(bytes).ok()
        })
        .filter(|target| target.starts_with("http"))
        .unwrap_or(absolute)
}

/// Parses the result-count header ("About 30,100 results",
/// "11-20 of 30,100 results", "30.100 Ergebnisse").
///
/// The estimate is the last number group in the text, so the page range in
/// "11-20 of ..." never leaks into the total. 0 when none is found.
pub fn parse_results_total(pattern: &Regex, text: &str) -> u64 {
    pattern
        .find_iter(text)
        .last()
        .map(|m| {
            m.as_str()
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Regex matching one number group, allowing locale thousands separators.
pub fn number_group_pattern() -> Regex {
    Regex::new(r"\d(?:[\d,.\u{a0}\u{202f}']*\d)?").expect("number pattern must compile")
}
