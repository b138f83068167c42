//! Tracing subscriber bootstrap.

use crate::config::GeneralConfig;
use crate::error::{AutobugError, Result};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used, with
/// `autobug` crates raised to `debug` in development.
///
/// # Errors
/// Returns `AutobugError::Internal` if a global subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_directives = if config.is_development() {
        format!("{},autobug=debug", config.log_level)
    } else {
        config.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| AutobugError::Internal(format!("tracing already initialized: {e}")))
}
