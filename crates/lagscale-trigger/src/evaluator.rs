//! Trigger evaluator — one bounded source call per trigger per tick.

use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lagscale_core::{
    epoch_secs, LagThresholds, MetricSample, ResolvedObject, ResolvedTrigger, ScaleError,
};

use crate::error::SourceError;
use crate::registry::SourceRegistry;

/// What one trigger contributed to a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Available {
        sample: MetricSample,
        active: bool,
        suggested: u32,
    },
    Unavailable {
        reason: String,
    },
}

/// Per-trigger result, in trigger order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub trigger: String,
    pub outcome: TriggerOutcome,
}

impl TriggerResult {
    fn available(trigger: &ResolvedTrigger, value: f64, max_replicas: u32) -> Self {
        let active = is_active(value, &trigger.thresholds);
        let suggested = if active {
            suggested_replicas(value, &trigger.thresholds, max_replicas)
        } else {
            0
        };

        debug!(
            trigger = %trigger.identity,
            value,
            active,
            suggested,
            "trigger evaluated"
        );

        Self {
            trigger: trigger.identity.clone(),
            outcome: TriggerOutcome::Available {
                sample: MetricSample {
                    trigger: trigger.identity.clone(),
                    value,
                    collected_at: epoch_secs(),
                },
                active,
                suggested,
            },
        }
    }

    fn unavailable(trigger: &ResolvedTrigger, error: SourceError) -> Self {
        warn!(trigger = %trigger.identity, error = %error, "trigger unavailable");
        Self {
            trigger: trigger.identity.clone(),
            outcome: TriggerOutcome::Unavailable {
                reason: error.to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.outcome, TriggerOutcome::Available { .. })
    }

    /// The adapter failure behind an unavailable trigger.
    pub fn error(&self) -> Option<ScaleError> {
        match &self.outcome {
            TriggerOutcome::Available { .. } => None,
            TriggerOutcome::Unavailable { reason } => Some(ScaleError::AdapterUnavailable {
                trigger: self.trigger.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// A trigger is active strictly above its activation threshold.
pub fn is_active(value: f64, thresholds: &LagThresholds) -> bool {
    value > thresholds.activation_lag_threshold
}

/// Replicas needed to drain `value` at `lagThreshold` per replica.
///
/// Negative values count as zero. A zero `lagThreshold` means any
/// backlog asks for `max_replicas`.
pub fn suggested_replicas(value: f64, thresholds: &LagThresholds, max_replicas: u32) -> u32 {
    let value = value.max(0.0);
    if thresholds.lag_threshold == 0.0 {
        return if value > 0.0 { max_replicas } else { 0 };
    }

    let desired = (value / thresholds.lag_threshold).ceil();
    if desired >= f64::from(max_replicas) {
        max_replicas
    } else {
        desired as u32
    }
}

/// Runs triggers against the sources in a shared registry.
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    registry: SourceRegistry,
}

impl TriggerEvaluator {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate one trigger. Never fails: errors become `Unavailable`.
    pub async fn evaluate(
        &self,
        trigger: &ResolvedTrigger,
        max_replicas: u32,
        timeout: Duration,
    ) -> TriggerResult {
        match self.read_value(trigger, timeout).await {
            Ok(value) => TriggerResult::available(trigger, value, max_replicas),
            Err(e) => TriggerResult::unavailable(trigger, e),
        }
    }

    /// Evaluate every trigger of `object` concurrently, preserving order.
    pub async fn evaluate_all(
        &self,
        object: &ResolvedObject,
        timeout: Duration,
    ) -> Vec<TriggerResult> {
        let max_replicas = object.limits.max;
        join_all(
            object
                .triggers
                .iter()
                .map(|trigger| self.evaluate(trigger, max_replicas, timeout)),
        )
        .await
    }

    async fn read_value(
        &self,
        trigger: &ResolvedTrigger,
        timeout: Duration,
    ) -> Result<f64, SourceError> {
        let trigger_type = &trigger.spec.trigger_type;
        let source = self
            .registry
            .get(trigger_type)
            .ok_or_else(|| SourceError::UnknownType(trigger_type.clone()))?;

        let value = tokio::time::timeout(timeout, source.metric_value(&trigger.spec.metadata))
            .await
            .map_err(|_| SourceError::Timeout(timeout))??;

        if !value.is_finite() {
            return Err(SourceError::Malformed(format!("non-finite value {value}")));
        }
        Ok(value)
    }
}
