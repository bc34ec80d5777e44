//! Structured logging infrastructure for Simlink.
//!
//! Centralized `tracing` subscriber initialization with support for
//! structured JSON output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` wins, then the explicit level, then `info`.
fn build_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        level
            .and_then(|l| EnvFilter::try_new(l).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    })
}

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use simlink_core::logging;
///
/// logging::init();
/// tracing::info!("Application started");
/// ```
pub fn init() {
    init_with_level(None);
}

/// Initialize logging with a level taken from the node's `log=<level>`
/// argument. `RUST_LOG` still takes precedence when set.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// # Example
/// ```no_run
/// use simlink_core::logging;
///
/// logging::init_json();
/// tracing::info!(service = "node", "Service started");
/// ```
pub fn init_json() {
    let _ = tracing_subscriber::registry()
        .with(build_filter(None))
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level(Some("debug"));
        init_with_level(Some("warn"));
        tracing::debug!("logging initialised twice without panicking");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // An unparsable directive must not panic; the filter degrades to `info`.
        let _ = build_filter(Some("not a [valid directive"));
    }
}
