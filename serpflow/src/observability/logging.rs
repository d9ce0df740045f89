//! Subscriber installation for binaries and tests.

use tracing_subscriber::EnvFilter;

use crate::errors::ConfigurationError;

/// Default filter directive for a verbosity level.
///
/// `0` is warnings only, `1` adds info, anything higher adds debug output.
#[must_use]
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "serpflow=warn",
        1 => "serpflow=info",
        _ => "serpflow=debug",
    }
}

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity`. With `json` set, events are
/// written as one JSON object per line.
pub fn init_logging(verbosity: u8, json: bool) -> Result<(), ConfigurationError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbosity)));

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };
    installed.map_err(|e| ConfigurationError::Invalid(format!("logging: {e}")))
}
