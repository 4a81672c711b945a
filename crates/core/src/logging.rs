//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::CoreConfig;

/// Filter directive implied by `config`
///
/// `debug` wins over `log_filter`.
pub fn filter_directive(config: &CoreConfig) -> &str {
    if config.debug {
        "debug"
    } else {
        &config.log_filter
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise [`filter_directive`]
///
/// An unparsable directive falls back to `info`.
pub fn env_filter(config: &CoreConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(filter_directive(config)).unwrap_or_else(|e| {
            eprintln!(
                "Invalid log filter '{}': {}, using 'info'",
                config.log_filter, e
            );
            EnvFilter::new("info")
        })
    })
}

/// Install the global fmt subscriber
///
/// # Returns
/// `false` if a global subscriber was already installed
pub fn init(config: &CoreConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .try_init()
        .is_ok()
}
