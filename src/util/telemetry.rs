//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Install the default subscriber: filtered from `RUST_LOG` when set,
/// falling back to `info` otherwise.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Install the default subscriber with `fallback` as the filter directive
/// used when `RUST_LOG` is absent or unparsable.
///
/// No-op when the host application has already installed a subscriber, so
/// it is safe to call repeatedly, e.g. from every integration test.
pub fn init_tracing_with(fallback: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
