//! Combines per-trigger results into one decision input.

use serde::{Deserialize, Serialize};

use lagscale_trigger::{TriggerOutcome, TriggerResult};

/// Aggregate of all triggers of one object for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    /// Every trigger was unavailable; the previous decision must be held.
    NoDecision { unavailable: usize },
    Decision {
        /// OR of all available triggers.
        active: bool,
        /// MAX of all available triggers.
        suggested: u32,
        /// First trigger, in config order, that produced `suggested`.
        driving_trigger: Option<String>,
        unavailable: usize,
    },
}

impl Aggregate {
    pub fn is_decision(&self) -> bool {
        matches!(self, Aggregate::Decision { .. })
    }
}

/// OR the activation signals and MAX the suggestions of available triggers.
pub fn aggregate(results: &[TriggerResult]) -> Aggregate {
    let mut active = false;
    let mut best: Option<(u32, &str)> = None;
    let mut unavailable = 0;

    for result in results {
        match &result.outcome {
            TriggerOutcome::Available {
                active: trigger_active,
                suggested,
                ..
            } => {
                active |= *trigger_active;
                // Strict comparison keeps the earliest trigger on ties.
                if best.is_none_or(|(current, _)| *suggested > current) {
                    best = Some((*suggested, &result.trigger));
                }
            }
            TriggerOutcome::Unavailable { .. } => unavailable += 1,
        }
    }

    match best {
        None => Aggregate::NoDecision { unavailable },
        Some((suggested, trigger)) => Aggregate::Decision {
            active,
            suggested,
            driving_trigger: Some(trigger.to_string()),
            unavailable,
        },
    }
}
