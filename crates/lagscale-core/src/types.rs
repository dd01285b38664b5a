//! Domain types for scalable objects, triggers, and scale decisions.
//!
//! `ScalableObject` and `TriggerSpec` mirror the declarative config as
//! written by the operator. `resolve()` turns them into `ResolvedObject`,
//! which is what scale loops run against.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ScaleError, ScaleResult};

/// Metadata key holding the backlog that equals one replica's worth of work.
pub const LAG_THRESHOLD_KEY: &str = "lagThreshold";

/// Metadata key holding the backlog above which a trigger is active.
pub const ACTIVATION_LAG_THRESHOLD_KEY: &str = "activationLagThreshold";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POLLING_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_COOLDOWN_PERIOD_SECONDS: u64 = 300;
pub const DEFAULT_MAX_REPLICA_COUNT: u32 = 100;

// ── Identity ──────────────────────────────────────────────────────

/// Namespace-scoped identity of a scalable object (`namespace/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub namespace: String,
    pub name: String,
}

impl ObjectId {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ── Scalable object ───────────────────────────────────────────────

/// A workload registered for autoscaling, as written in config.
///
/// Field names accept the camelCase manifest spelling as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalableObject {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Floor when idle. Zero enables scale-to-zero.
    #[serde(default, alias = "minReplicaCount")]
    pub min_replica_count: u32,
    #[serde(default = "default_max_replica_count", alias = "maxReplicaCount")]
    pub max_replica_count: u32,
    /// Tick period of the scale loop.
    #[serde(
        default = "default_polling_interval_seconds",
        alias = "pollingIntervalSeconds",
        alias = "pollingInterval"
    )]
    pub polling_interval_seconds: u64,
    /// Time the object must stay inactive before dropping to the floor.
    #[serde(
        default = "default_cooldown_period_seconds",
        alias = "cooldownPeriodSeconds",
        alias = "cooldownPeriod"
    )]
    pub cooldown_period_seconds: u64,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_max_replica_count() -> u32 {
    DEFAULT_MAX_REPLICA_COUNT
}

fn default_polling_interval_seconds() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECONDS
}

fn default_cooldown_period_seconds() -> u64 {
    DEFAULT_COOLDOWN_PERIOD_SECONDS
}

impl ScalableObject {
    /// Create an object with default limits, timings and no triggers.
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            min_replica_count: 0,
            max_replica_count: DEFAULT_MAX_REPLICA_COUNT,
            polling_interval_seconds: DEFAULT_POLLING_INTERVAL_SECONDS,
            cooldown_period_seconds: DEFAULT_COOLDOWN_PERIOD_SECONDS,
            triggers: Vec::new(),
        }
    }

    /// Set the replica bounds.
    pub fn with_replicas(mut self, min: u32, max: u32) -> Self {
        self.min_replica_count = min;
        self.max_replica_count = max;
        self
    }

    /// Set the tick period in seconds.
    pub fn with_polling_interval(mut self, seconds: u64) -> Self {
        self.polling_interval_seconds = seconds;
        self
    }

    /// Set the cooldown period in seconds.
    pub fn with_cooldown_period(mut self, seconds: u64) -> Self {
        self.cooldown_period_seconds = seconds;
        self
    }

    /// Append a trigger.
    pub fn with_trigger(mut self, trigger: TriggerSpec) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// The object's `namespace/name` identity.
    pub fn id(&self) -> ObjectId {
        ObjectId::new(&self.namespace, &self.name)
    }

    /// Validate the object and parse every trigger's thresholds.
    pub fn resolve(&self) -> ScaleResult<ResolvedObject> {
        if self.name.trim().is_empty() {
            return Err(ScaleError::invalid("scalable object name must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(ScaleError::invalid(format!(
                "{}: namespace must not be empty",
                self.name
            )));
        }

        let id = self.id();

        if self.max_replica_count == 0 {
            return Err(ScaleError::invalid(format!(
                "{id}: maxReplicaCount must be greater than zero"
            )));
        }
        if self.min_replica_count > self.max_replica_count {
            return Err(ScaleError::invalid(format!(
                "{id}: minReplicaCount ({}) exceeds maxReplicaCount ({})",
                self.min_replica_count, self.max_replica_count
            )));
        }
        if self.polling_interval_seconds == 0 {
            return Err(ScaleError::invalid(format!(
                "{id}: pollingIntervalSeconds must be positive"
            )));
        }
        if self.triggers.is_empty() {
            return Err(ScaleError::invalid(format!("{id}: at least one trigger is required")));
        }

        let mut seen = HashSet::new();
        let mut triggers = Vec::with_capacity(self.triggers.len());
        for (index, spec) in self.triggers.iter().enumerate() {
            if spec.trigger_type.trim().is_empty() {
                return Err(ScaleError::invalid(format!(
                    "{id}: trigger {index} has an empty type"
                )));
            }

            let identity = spec.identity(index);
            if !seen.insert(identity.clone()) {
                return Err(ScaleError::invalid(format!(
                    "{id}: duplicate trigger name {identity}"
                )));
            }

            let thresholds = spec.thresholds().map_err(|e| match e {
                ScaleError::InvalidConfiguration(msg) => {
                    ScaleError::invalid(format!("{id}: trigger {identity}: {msg}"))
                }
                other => other,
            })?;

            triggers.push(ResolvedTrigger {
                identity,
                spec: spec.clone(),
                thresholds,
            });
        }

        Ok(ResolvedObject {
            id,
            limits: ReplicaLimits {
                min: self.min_replica_count,
                max: self.max_replica_count,
            },
            polling_interval: Duration::from_secs(self.polling_interval_seconds),
            cooldown_period: Duration::from_secs(self.cooldown_period_seconds),
            triggers,
        })
    }
}

// ── Triggers ──────────────────────────────────────────────────────

/// One metric source plus the thresholds that drive scaling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerSpec {
    /// Selects the metric source, e.g. "stan" or "kafka".
    #[serde(rename = "type")]
    pub trigger_type: String,
    /// Optional stable name; defaults to `{type}-{index}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source-specific settings plus `lagThreshold` / `activationLagThreshold`.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TriggerSpec {
    /// Create an unnamed trigger of the given type with no metadata.
    pub fn new(trigger_type: &str) -> Self {
        Self {
            trigger_type: trigger_type.to_string(),
            name: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add or replace one metadata entry.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Stable identity used in reports and for aggregation tie-breaks.
    pub fn identity(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{}-{index}", self.trigger_type),
        }
    }

    pub fn thresholds(&self) -> ScaleResult<LagThresholds> {
        LagThresholds::from_metadata(&self.metadata)
    }
}

/// Parsed scaling and activation thresholds of a lag-style trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagThresholds {
    /// Backlog that corresponds to one replica.
    pub lag_threshold: f64,
    /// Backlog above which the trigger counts as active.
    pub activation_lag_threshold: f64,
}

impl LagThresholds {
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> ScaleResult<Self> {
        let lag_threshold = parse_threshold(metadata, LAG_THRESHOLD_KEY)?.ok_or_else(|| {
            ScaleError::invalid(format!("missing required metadata {LAG_THRESHOLD_KEY}"))
        })?;
        let activation_lag_threshold =
            parse_threshold(metadata, ACTIVATION_LAG_THRESHOLD_KEY)?.unwrap_or(0.0);

        Ok(Self {
            lag_threshold,
            activation_lag_threshold,
        })
    }
}

fn parse_threshold(metadata: &BTreeMap<String, String>, key: &str) -> ScaleResult<Option<f64>> {
    let Some(raw) = metadata.get(key) else {
        return Ok(None);
    };

    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ScaleError::invalid(format!("{key} is not a number: {raw:?}")))?;

    if !value.is_finite() {
        return Err(ScaleError::invalid(format!("{key} must be finite: {raw:?}")));
    }
    if value < 0.0 {
        return Err(ScaleError::invalid(format!("{key} must not be negative: {raw:?}")));
    }
    Ok(Some(value))
}

// ── Resolved form ─────────────────────────────────────────────────

/// Inclusive replica bounds of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaLimits {
    pub min: u32,
    pub max: u32,
}

impl ReplicaLimits {
    pub fn clamp(&self, replicas: u32) -> u32 {
        replicas.clamp(self.min, self.max)
    }

    /// Lowest target allowed while active: at least one replica.
    pub fn active_floor(&self) -> u32 {
        self.min.max(1).min(self.max)
    }
}

/// A trigger whose thresholds have been parsed and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrigger {
    pub identity: String,
    pub spec: TriggerSpec,
    pub thresholds: LagThresholds,
}

/// A validated scalable object, ready to be driven by a scale loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedObject {
    pub id: ObjectId,
    pub limits: ReplicaLimits,
    pub polling_interval: Duration,
    pub cooldown_period: Duration,
    pub triggers: Vec<ResolvedTrigger>,
}

impl ResolvedObject {
    /// Deadline for a single metric source call.
    ///
    /// Always strictly below the polling interval: 90% of it, further
    /// capped by `cap` when one is configured.
    pub fn trigger_timeout(&self, cap: Option<Duration>) -> Duration {
        let budget = self.polling_interval - self.polling_interval / 10;
        match cap {
            Some(cap) if !cap.is_zero() => budget.min(cap),
            _ => budget,
        }
    }
}

// ── Per-tick values ───────────────────────────────────────────────

/// One metric reading, owned by the tick that collected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub trigger: String,
    pub value: f64,
    /// Unix timestamp (seconds) of collection.
    pub collected_at: u64,
}

/// The outcome of one tick for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDecision {
    pub desired_replicas: u32,
    pub is_active: bool,
    /// Unix timestamp (seconds) of the decision.
    pub decided_at: u64,
}

pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
