//! Structured logging initialization.

use tracing_subscriber::EnvFilter;

/// Install the global JSON subscriber.
///
/// Filtering is `RUST_LOG` driven with an `info` default. Calling this more
/// than once is harmless; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .try_init();
}
