//! lagscale.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScaleResult;
use crate::types::{ResolvedObject, ScalableObject};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, alias = "scaledObjects")]
    pub scaled_objects: Vec<ScalableObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on a single metric source call, in milliseconds.
    pub trigger_timeout_ms: Option<u64>,
    /// Capacity of the tick report broadcast channel.
    #[serde(default = "default_report_buffer")]
    pub report_buffer: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            trigger_timeout_ms: None,
            report_buffer: default_report_buffer(),
        }
    }
}

impl EngineSettings {
    pub fn trigger_timeout_cap(&self) -> Option<Duration> {
        self.trigger_timeout_ms.map(Duration::from_millis)
    }
}

fn default_report_buffer() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> ScaleResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ScaleResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate every scaled object, failing on the first invalid one.
    pub fn resolve_all(&self) -> ScaleResult<Vec<ResolvedObject>> {
        self.scaled_objects.iter().map(ScalableObject::resolve).collect()
    }
}
