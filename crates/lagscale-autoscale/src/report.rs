//! Per-tick observability record.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lagscale_core::{ObjectId, ScaleDecision};
use lagscale_trigger::TriggerResult;

use crate::aggregate::Aggregate;
use crate::cooldown::CooldownState;

/// Everything one tick observed and decided for one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub object: ObjectId,
    /// 1-based tick sequence number within the object's loop.
    pub tick: u64,
    pub triggers: Vec<TriggerResult>,
    pub aggregate: Aggregate,
    pub state: CooldownState,
    pub decision: ScaleDecision,
    /// Replicas successfully handed to the executor this tick.
    /// `None` when the decision was held or the executor failed.
    pub applied_replicas: Option<u32>,
    pub errors: Vec<String>,
}

impl TickReport {
    /// True when every trigger was unavailable and the decision was held.
    pub fn is_degraded(&self) -> bool {
        !self.aggregate.is_decision()
    }

    /// Log the report as a single structured event.
    pub fn emit(&self) {
        let record = serde_json::to_string(self).unwrap_or_default();
        if self.errors.is_empty() {
            info!(
                object = %self.object,
                tick = self.tick,
                replicas = self.decision.desired_replicas,
                active = self.decision.is_active,
                state = ?self.state,
                %record,
                "scale tick"
            );
        } else {
            warn!(
                object = %self.object,
                tick = self.tick,
                replicas = self.decision.desired_replicas,
                degraded = self.is_degraded(),
                errors = self.errors.len(),
                %record,
                "scale tick with errors"
            );
        }
    }
}
