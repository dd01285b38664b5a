//! In-memory metric source.
//!
//! Holds named gauges that callers set directly. A trigger selects its
//! gauge through one metadata key (e.g. `subject`), so the same source
//! can stand in for any broker whose triggers name a queue or channel.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::source::MetricSource;

#[derive(Debug, Clone)]
enum Reading {
    Value(f64),
    Failing(String),
}

/// Concurrency-safe gauge store implementing `MetricSource`.
#[derive(Debug)]
pub struct InMemorySource {
    /// Metadata key whose value names the gauge.
    key: String,
    gauges: RwLock<HashMap<String, Reading>>,
    /// Artificial delay applied to every read.
    latency: Option<Duration>,
}

impl InMemorySource {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            gauges: RwLock::new(HashMap::new()),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set(&self, gauge: &str, value: f64) {
        self.write(gauge, Reading::Value(value));
    }

    /// Make reads of `gauge` fail with `reason` until the next `set`.
    pub fn fail(&self, gauge: &str, reason: &str) {
        self.write(gauge, Reading::Failing(reason.to_string()));
    }

    pub fn clear(&self, gauge: &str) {
        let mut gauges = self.gauges.write().unwrap_or_else(|e| e.into_inner());
        gauges.remove(gauge);
    }

    fn write(&self, gauge: &str, reading: Reading) {
        let mut gauges = self.gauges.write().unwrap_or_else(|e| e.into_inner());
        gauges.insert(gauge.to_string(), reading);
    }

    fn read(&self, gauge: &str) -> Option<Reading> {
        let gauges = self.gauges.read().unwrap_or_else(|e| e.into_inner());
        gauges.get(gauge).cloned()
    }
}

#[async_trait]
impl MetricSource for InMemorySource {
    async fn metric_value(&self, metadata: &BTreeMap<String, String>) -> Result<f64, SourceError> {
        let gauge = metadata
            .get(&self.key)
            .ok_or_else(|| SourceError::MissingMetadata(self.key.clone()))?;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.read(gauge) {
            Some(Reading::Value(v)) => Ok(v),
            Some(Reading::Failing(reason)) => Err(SourceError::Unreachable(reason)),
            None => Err(SourceError::Unreachable(format!("no gauge named {gauge}"))),
        }
    }
}
