//! Logging setup
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. [`init_logging`] is a convenience for binaries and
//! tests that want the usual formatted output.

use crate::config::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` with
/// [`EngineConfig::debug_logging`] and `info` without. Returns `false` when
/// a global subscriber was already installed, which is not an error.
pub fn init_logging(config: &EngineConfig) -> bool {
    let fallback = if config.debug_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = EngineConfig {
            debug_logging: true,
            ..EngineConfig::default()
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
