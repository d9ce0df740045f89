//! Run settings and query inputs.

mod input;
mod settings;

pub use input::{resolve, InputFile, SearchInput};
pub use settings::{OutputSettings, RequestSettings, ScraperSettings};
