//! Tracing/logging initialization for the Pebble binaries.
//!
//! Sets up `tracing_subscriber` with an env-filter and either the
//! human-readable or the JSON formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `log.filter` when it is set, so operators can raise
/// verbosity without touching the config file.
pub fn init_tracing(log: &LogConfig) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| log.filter.clone()),
    );
    if log.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
