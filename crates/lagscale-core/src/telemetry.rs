//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured filter.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_noop() {
        let config = LoggingConfig {
            filter: "lagscale=debug".to_string(),
            json: false,
        };
        init(&config);
        assert!(!init(&config));
    }
}
