//! Field lookup for result regions.
//!
//! Result layouts drift. Every field lookup goes through a [`FieldLocator`],
//! which returns `None` or an empty value when a field cannot be found, so a
//! layout change degrades one field instead of failing the page.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fmt;

use super::text::{absolutize, decode_bing_redirect, element_text, element_text_spaced};
use crate::core::ResultKind;
use crate::errors::ConfigurationError;

/// Field lookups for one kind of result region.
pub trait FieldLocator: Send + Sync + fmt::Debug {
    /// Which kind of result this locator produces.
    fn kind(&self) -> ResultKind;

    /// Result items in document order.
    fn items<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>>;

    /// Title text and target URL. Items without one are skipped.
    fn title_and_url(&self, item: ElementRef<'_>) -> Option<(String, String)>;

    /// Snippet text, or empty.
    fn description(&self, item: ElementRef<'_>) -> String;

    /// URL shown under the title.
    fn displayed_url(&self, item: ElementRef<'_>) -> Option<String>;

    /// Favicon URL.
    fn icon_url(&self, item: ElementRef<'_>) -> Option<String>;

    /// Bold keywords, deduplicated case-insensitively, first occurrence kept.
    fn emphasized_keywords(&self, item: ElementRef<'_>) -> Vec<String>;
}

/// CSS selectors for one region variant.
#[derive(Debug, Clone)]
pub struct LocatorCss {
    /// Result items.
    pub items: String,
    /// Title link inside an item.
    pub title_link: String,
    /// Snippet inside an item.
    pub description: String,
    /// Displayed URL inside an item.
    pub displayed_url: String,
    /// Favicon inside an item.
    pub icon: String,
    /// Emphasized keywords inside an item.
    pub emphasis: String,
}

impl LocatorCss {
    /// Selectors for Bing's organic listings.
    #[must_use]
    pub fn organic() -> Self {
        Self {
            items: "#b_results li.b_algo".to_string(),
            title_link: "h2 a[href]".to_string(),
            description: ".b_caption p, p".to_string(),
            displayed_url: "div.b_attribution cite, cite".to_string(),
            icon: "img.favicon, img.b_primicon, .sh_favicon img".to_string(),
            emphasis: "strong".to_string(),
        }
    }

    /// Selectors for Bing's ad blocks.
    #[must_use]
    pub fn paid() -> Self {
        Self {
            items: "#b_results li.b_ad, #b_results li.b_adresult, #b_pole li.b_ad".to_string(),
            title_link: "h2 a[href]".to_string(),
            description: ".b_caption p, p".to_string(),
            displayed_url: "div.b_adurl cite, div.b_attribution cite, cite".to_string(),
            icon: "img.favicon, img.b_primicon".to_string(),
            emphasis: "strong".to_string(),
        }
    }
}

/// A [`FieldLocator`] driven by CSS selectors.
#[derive(Debug)]
pub struct SelectorLocator {
    kind: ResultKind,
    items: Selector,
    title_link: Selector,
    description: Selector,
    displayed_url: Selector,
    icon: Selector,
    emphasis: Selector,
}

fn parse(css: &str) -> Result<Selector, ConfigurationError> {
    Selector::parse(css).map_err(|e| ConfigurationError::Invalid(format!("selector '{css}': {e}")))
}

impl SelectorLocator {
    /// Compiles a locator from selector text.
    pub fn from_css(kind: ResultKind, css: &LocatorCss) -> Result<Self, ConfigurationError> {
        Ok(Self {
            kind,
            items: parse(&css.items)?,
            title_link: parse(&css.title_link)?,
            description: parse(&css.description)?,
            displayed_url: parse(&css.displayed_url)?,
            icon: parse(&css.icon)?,
            emphasis: parse(&css.emphasis)?,
        })
    }

    /// The organic listing locator.
    #[must_use]
    pub fn organic() -> Self {
        Self::from_css(ResultKind::Organic, &LocatorCss::organic())
            .expect("built-in organic selectors must parse")
    }

    /// The ad locator.
    #[must_use]
    pub fn paid() -> Self {
        Self::from_css(ResultKind::Ad, &LocatorCss::paid())
            .expect("built-in ad selectors must parse")
    }
}

impl FieldLocator for SelectorLocator {
    fn kind(&self) -> ResultKind {
        self.kind
    }

    fn items<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.items).collect()
    }

    fn title_and_url(&self, item: ElementRef<'_>) -> Option<(String, String)> {
        let link = item.select(&self.title_link).next()?;
        let href = link.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        Some((element_text(link), decode_bing_redirect(href)))
    }

    fn description(&self, item: ElementRef<'_>) -> String {
        item.select(&self.description)
            .map(element_text_spaced)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    fn displayed_url(&self, item: ElementRef<'_>) -> Option<String> {
        item.select(&self.displayed_url)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    fn icon_url(&self, item: ElementRef<'_>) -> Option<String> {
        let img = item.select(&self.icon).next()?;
        let value = img.value();
        let src = value
            .attr("src")
            .filter(|s| !s.trim().is_empty() && !s.starts_with("data:"))
            .or_else(|| value.attr("data-src"))?;
        absolutize(src)
    }

    fn emphasized_keywords(&self, item: ElementRef<'_>) -> Vec<String> {
        let mut seen = HashSet::new();
        item.select(&self.emphasis)
            .map(element_text)
            .filter(|kw| !kw.is_empty() && seen.insert(kw.to_lowercase()))
            .collect()
    }
}
