//! Result extraction.
//!
//! Everything layout-dependent lives here: the [`FieldLocator`] seam for
//! listing fields and the selectors for the page-level regions.

mod extractor;
mod locator;
mod text;

pub use extractor::{ExtractionOutcome, ResultExtractor};
pub use locator::{FieldLocator, LocatorCss, SelectorLocator};
pub use text::{absolutize, collapse_whitespace, decode_bing_redirect, BING_ORIGIN};
