//! Cooldown controller — asymmetric hysteresis for scale-down.
//!
//! Activation scales up on the same tick. Deactivation holds the last
//! target until the cooldown period has passed since the last active
//! tick, then drops to the configured floor.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use lagscale_core::ReplicaLimits;

use crate::aggregate::Aggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownState {
    /// At least one trigger is active.
    Active,
    /// Inactive, but still inside the cooldown period.
    CoolingDown,
    /// Inactive and cooled down; target is `minReplicaCount`.
    Idle,
}

/// Per-object cooldown state machine.
#[derive(Debug, Clone)]
pub struct CooldownController {
    state: CooldownState,
    target: u32,
    last_active_at: Option<Instant>,
}

impl CooldownController {
    /// Start idle at the object's floor.
    pub fn new(limits: ReplicaLimits) -> Self {
        Self {
            state: CooldownState::Idle,
            target: limits.min,
            last_active_at: None,
        }
    }

    pub fn state(&self) -> CooldownState {
        self.state
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn last_active_at(&self) -> Option<Instant> {
        self.last_active_at
    }

    /// Feed one tick's aggregate and return the replica target.
    ///
    /// `limits` and `cooldown` are read per call so that a reconfigured
    /// object takes effect on the next tick. Held targets are re-clamped
    /// to the current limits.
    pub fn observe(
        &mut self,
        aggregate: &Aggregate,
        limits: ReplicaLimits,
        cooldown: Duration,
        now: Instant,
    ) -> u32 {
        match aggregate {
            Aggregate::NoDecision { .. } => {
                self.target = limits.clamp(self.target);
            }
            Aggregate::Decision {
                active: true,
                suggested,
                ..
            } => {
                self.state = CooldownState::Active;
                self.last_active_at = Some(now);
                self.target = (*suggested).clamp(limits.active_floor(), limits.max);
            }
            Aggregate::Decision { active: false, .. } => {
                if self.state == CooldownState::Active {
                    self.state = CooldownState::CoolingDown;
                }
                if self.state == CooldownState::CoolingDown && self.cooled_down(cooldown, now) {
                    self.state = CooldownState::Idle;
                }
                self.target = match self.state {
                    CooldownState::Idle => limits.min,
                    _ => limits.clamp(self.target),
                };
            }
        }
        self.target
    }

    fn cooled_down(&self, cooldown: Duration, now: Instant) -> bool {
        match self.last_active_at {
            Some(at) => now.saturating_duration_since(at) >= cooldown,
            None => true,
        }
    }
}
