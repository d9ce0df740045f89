//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{init_logging, verbosity_filter};
pub use timer::SpanTimer;
