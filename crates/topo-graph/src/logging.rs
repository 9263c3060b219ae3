//! Logging setup
//!
//! The library only emits `tracing` events. Binaries and tests that want
//! to see them call [`init`] once with the configured level and format;
//! `RUST_LOG` takes precedence over the configured level when set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::graph::{GraphError, Result};

/// Install the global subscriber. Returns `Ok(false)` when a subscriber was
/// already installed (by an earlier call or by the host application).
pub fn init(config: &LoggingConfig) -> Result<bool> {
    config.validate()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| GraphError::Config(format!("Invalid log filter: {}", e)))?,
    };

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init(),
    };
    Ok(installed.is_ok())
}
