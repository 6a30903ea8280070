//! Logging configuration

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::VolleyError;

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Enable debug-level output
    pub debug: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { debug: false }
    }
}

/// Initialize logging.
///
/// `RUST_LOG` wins over the debug flag when set, so individual modules can
/// still be turned up without recompiling.
pub fn init_logging(options: LogOptions) -> Result<(), VolleyError> {
    let default_level = if options.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| VolleyError::ConfigError(e.to_string()))?;

    Ok(())
}
