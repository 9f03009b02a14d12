//! Logging initialization for the host
//!
//! - Respects RUST_LOG; it always wins over a configured filter
//! - Falls back to the config filter, then to "info"
//! - Respects NO_COLOR
//!
//! Modules do not install their own subscriber. They log inside the span
//! returned by `ModuleRuntimeContext::module_span`.
//!
//! # Usage
//! ```no_run
//! use modhost::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Resolve the effective filter: RUST_LOG, then `filter`, then "info"
fn build_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(filter.unwrap_or("info"))
}

/// Initialize human-readable logging to stderr
///
/// # Arguments
/// * `filter` - Optional log filter from config (e.g., "info", "modhost=debug,hyper=warn")
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(build_filter(filter))
        .init();
}

/// Initialize logging with JSON output, including span context
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(build_filter(filter))
        .init();
}

/// Initialize logging from the `[logging]` config section
///
/// `json_format` without the `json-logging` feature falls back to plain output.
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
            tracing::warn!("json_format requested but the json-logging feature is disabled");
        }
    } else {
        init_logging(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_rust_log_takes_precedence() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = build_filter(Some("debug"));
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_config_filter_then_default() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(build_filter(Some("modhost=debug")).to_string(), "modhost=debug");
        assert_eq!(build_filter(None).to_string(), "info");
    }
}
