//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; applications embedding the client
//! call [`init_logging`] once to get them printed on stderr.

use crate::config::LoggingSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber honouring `RUST_LOG`, falling back to the
/// configured level (or `debug` when verbose).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let fallback = if settings.verbose {
        "debug".to_string()
    } else {
        settings.level.clone()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
