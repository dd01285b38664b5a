//! Error types for the lagscale engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Errors that can occur while configuring or running scale loops.
///
/// Only `InvalidConfiguration`, `NotRegistered`, `Io` and `Parse` are ever
/// returned to callers. The remaining variants are recorded in tick
/// reports; none of them stops a scale loop.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("trigger {trigger} unavailable: {reason}")]
    AdapterUnavailable { trigger: String, reason: String },

    #[error("all {0} triggers unavailable, holding previous decision")]
    AllTriggersUnavailable(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("scaling executor failed for {object}: {reason}")]
    ExecutorFailure { object: String, reason: String },

    #[error("scalable object not registered: {0}")]
    NotRegistered(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ScaleError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ScaleError::InvalidConfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ScaleError::AdapterUnavailable {
            trigger: "stan-0".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "trigger stan-0 unavailable: connection refused"
        );

        let err = ScaleError::ExecutorFailure {
            object: "default/worker".to_string(),
            reason: "conflict".to_string(),
        };
        assert!(err.to_string().contains("default/worker"));
    }

    #[test]
    fn all_unavailable_mentions_hold() {
        let err = ScaleError::AllTriggersUnavailable(2);
        assert!(err.to_string().contains("holding previous decision"));
    }
}
