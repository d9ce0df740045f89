//! Page fetching.

mod config;
#[cfg(feature = "http")]
mod http;
mod protocols;

pub use config::FetchConfig;
#[cfg(feature = "http")]
pub use http::ReqwestFetcher;
#[cfg(test)]
pub use protocols::MockFetcher;
pub use protocols::{FetchRequest, FetchResponse, Fetcher};
