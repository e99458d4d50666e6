//! Logging initialization and configuration.
//!
//! Log output goes to stderr; stdout belongs to the interactive sessions.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when none is configured or the configured one is invalid.
pub const DEFAULT_FILTER: &str = "nested_shell=warn";

/// Filter used by `--debug`.
pub const DEBUG_FILTER: &str = "nested_shell=debug";

fn build_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with the given filter directive.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(filter: &str) {
    tracing_subscriber::registry()
        .with(build_filter(filter))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Err` if logging has already been initialized.
pub fn try_init(filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(filter))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        // First call may or may not succeed depending on test order
        let _ = try_init(DEFAULT_FILTER);
        let _ = try_init(DEBUG_FILTER);
    }

    #[test]
    fn test_invalid_filter_falls_back() {
        let _ = try_init("nested_shell=[[[");
        tracing::warn!("still logging after a bad filter");
    }
}
