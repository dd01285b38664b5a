//! Trigger type → metric source lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::source::MetricSource;

/// Maps trigger types to the shared source instance serving them.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn MetricSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the source for `trigger_type`.
    pub fn register(&mut self, trigger_type: &str, source: Arc<dyn MetricSource>) {
        self.sources.insert(trigger_type.to_string(), source);
        debug!(%trigger_type, "metric source registered");
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_source(mut self, trigger_type: &str, source: Arc<dyn MetricSource>) -> Self {
        self.register(trigger_type, source);
        self
    }

    /// Source serving `trigger_type`, if one is registered.
    pub fn get(&self, trigger_type: &str) -> Option<Arc<dyn MetricSource>> {
        self.sources.get(trigger_type).cloned()
    }

    /// Registered trigger types, sorted.
    pub fn trigger_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.sources.keys().cloned().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("trigger_types", &self.trigger_types())
            .finish()
    }
}
