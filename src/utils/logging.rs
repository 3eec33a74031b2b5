//! Structured logging setup.
//!
//! The codec itself only emits `tracing` events; installing a subscriber is
//! left to the application. [`init_logging`] is a convenience for binaries,
//! demos and tests that want the configured format without wiring
//! `tracing-subscriber` themselves.

use crate::config::LoggingConfig;
use crate::error::{CodecError, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Install a global subscriber for `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| CodecError::ConfigError(format!("Failed to initialize logging: {e}")))?;
    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
