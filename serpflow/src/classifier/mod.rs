//! Page classification.
//!
//! Decides whether a fetched page carries real results, is a soft block worth
//! retrying, or is a fatal failure.

mod page_classifier;
mod signals;

pub use page_classifier::{Classification, PageClassifier, THROTTLE_SIGNAL, TRANSPORT_SIGNAL};
pub use signals::{
    CaptchaMarkerSignal, EmptyResultsSignal, MissingContainerSignal, PageView, SignalSet,
    SoftBlockSignal, DEFAULT_SOFT_BLOCK_HINTS,
};
