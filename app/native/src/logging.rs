//! Logging setup.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! The filter is read from `THEMED_LOG`, then `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "THEMED_LOG";

const DEFAULT_FILTER: &str = "info";

/// Builds the log filter from the environment.
#[must_use]
pub fn env_filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_default();
    filter_from(&directives)
}

fn filter_from(directives: &str) -> EnvFilter {
    if directives.trim().is_empty() {
        return EnvFilter::new(DEFAULT_FILTER);
    }
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("themed: warning: invalid log filter '{directives}': {err}");
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Installs the global subscriber.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn empty_filter_defaults_to_info() {
        assert_eq!(filter_from("").max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(filter_from("   ").max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn valid_filter_is_kept() {
        assert_eq!(filter_from("themed_lib=debug").max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn invalid_filter_falls_back() {
        assert_eq!(filter_from("themed_lib=loud").max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init();
        init();
    }
}
