//! Structured logging setup.
//!
//! Library code only emits `tracing` events; binaries and the Python module
//! call [`init_logging`] once to install a subscriber.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Parse a level name, falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    match level.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a global fmt subscriber. Later calls are no-ops.
///
/// `RUST_LOG` directives are honored on top of `level`.
pub fn init_logging(level: &str, json_format: bool) {
    let level = parse_level(level);

    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env().add_directive(level.into());

        // Another subscriber may already be installed by the host process.
        let installed = if json_format {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        };

        if installed.is_ok() {
            tracing::debug!(%level, json_format, "Logging initialized");
        }
    });
}
