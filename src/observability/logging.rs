//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Compact format for terminals, full format otherwise
//! - `RUST_LOG` overrides the configured level when set

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if present, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let compact = config.compact.then(|| fmt::layer().compact());
    let full = (!config.compact).then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(compact)
        .with(full)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // another test may have won the race; only the second call is certain
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
