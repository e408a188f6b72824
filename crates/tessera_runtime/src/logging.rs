//! Logging initialisation.

use tessera_foundation::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Builds the filter for a directive string such as `info` or
/// `tessera_storage=debug,warn`.
///
/// # Errors
///
/// Returns an invalid argument error if the directives do not parse.
pub fn filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| Error::invalid_argument(format!("invalid log filter {directives:?}: {e}")))
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already
/// installed.
pub fn init(directives: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(directives)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::internal(format!("logging already initialised: {e}")))
}
