//! Metric source error types.

use std::time::Duration;

use thiserror::Error;

/// Reasons a metric source could not produce a value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("no metric source registered for trigger type {0}")]
    UnknownType(String),

    #[error("missing metadata key {0}")]
    MissingMetadata(String),

    #[error("metric source unreachable: {0}")]
    Unreachable(String),

    #[error("malformed metric response: {0}")]
    Malformed(String),

    #[error("metric source timed out after {0:?}")]
    Timeout(Duration),
}
