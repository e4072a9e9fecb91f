//! Logging initialization
//!
//! `RUST_LOG` always wins. Otherwise the filter from the config file is used,
//! falling back to `info`. Output goes to stderr; `NO_COLOR` disables ANSI
//! colors.
//!
//! ```rust,no_run
//! use rabit_guard::utils::init_logging;
//!
//! init_logging(Some("rabit_guard=debug"));
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the effective filter: RUST_LOG, then `configured`, then "info"
fn resolve_filter(configured: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    match configured {
        Some(f) => EnvFilter::try_new(f).unwrap_or_else(|e| {
            eprintln!("Invalid log filter {:?} ({}), using \"info\"", f, e);
            EnvFilter::new("info")
        }),
        None => EnvFilter::new("info"),
    }
}

/// Initialize human-readable logging
///
/// Uses `try_init`, so a second call (for example from tests) is a no-op.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(resolve_filter(filter))
        .try_init();
}

/// Initialize JSON-lines logging for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(resolve_filter(filter))
        .try_init();
}

/// Initialize logging from the `[logging]` section of the config
pub fn init_logging_from_config(config: Option<&crate::config::LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            // Fall back to regular logging if json-logging feature not enabled
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
