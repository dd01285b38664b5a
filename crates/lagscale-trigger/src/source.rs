//! The capability every metric source adapter implements.

use std::collections::BTreeMap;

use async_trait::async_trait;

use lagscale_core::LagThresholds;

use crate::error::SourceError;

/// A source of scalar metric values, e.g. consumer lag of a queue group.
///
/// One instance serves every trigger of its type across all scalable
/// objects, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current value for the trigger described by `metadata`.
    async fn metric_value(&self, metadata: &BTreeMap<String, String>) -> Result<f64, SourceError>;

    /// Whether the trigger is above its activation threshold.
    async fn is_active(&self, metadata: &BTreeMap<String, String>) -> Result<bool, SourceError> {
        let thresholds = LagThresholds::from_metadata(metadata)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        let value = self.metric_value(metadata).await?;
        Ok(value > thresholds.activation_lag_threshold)
    }
}
