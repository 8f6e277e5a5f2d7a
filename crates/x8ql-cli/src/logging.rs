//! Logging setup, powered by tracing-subscriber
//!
//! Library crates only emit `tracing` events; this is the one place a
//! subscriber gets installed. Output goes to stderr so it never mixes with
//! JSON or formatted query text on stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--log-level` is absent
pub const LOG_ENV: &str = "X8QL_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Build the filter from an explicit level or directive string, falling
/// back to `X8QL_LOG` and then to `warn`.
fn build_env_filter(level: Option<&str>) -> (EnvFilter, Option<String>) {
    match level {
        Some(level) => match EnvFilter::try_new(level) {
            Ok(filter) => (filter, None),
            Err(e) => (
                EnvFilter::new(DEFAULT_LEVEL),
                Some(format!("invalid log level '{}': {}", level, e)),
            ),
        },
        None => match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new(DEFAULT_LEVEL), None),
        },
    }
}

pub fn init_logging(level: Option<&str>) {
    let (filter, problem) = build_env_filter(level);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    if let Some(problem) = problem {
        tracing::warn!("{}, using '{}'", problem, DEFAULT_LEVEL);
    }
    tracing::trace!("Logging initialized");
}
