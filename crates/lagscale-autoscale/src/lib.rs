//! lagscale-autoscale — trigger-driven replica decisions.
//!
//! Each registered scalable object gets its own scale loop. Every
//! polling interval the loop evaluates all triggers, aggregates their
//! suggestions, runs the result through the cooldown state machine, and
//! hands the decision to the scaling executor.
//!
//! # Architecture
//!
//! ```text
//! ScaleEngine
//!   ├── SourceRegistry (shared metric sources)
//!   ├── ScalingExecutor (applies replica counts)
//!   └── Per-object task (ScaleLoop)
//!       ├── watch::Receiver<Arc<ResolvedObject>> (atomic reconfiguration)
//!       ├── TriggerEvaluator → aggregate() → CooldownController
//!       └── TickReport → tracing + broadcast
//! ```
//!
//! # Cooldown
//!
//! ```text
//! Idle ──active──► Active ──inactive──► CoolingDown ──cooldown elapsed──► Idle
//!                    ▲                        │
//!                    └────────active──────────┘
//! ```
//!
//! Scale-up is applied on the tick that observes it. Dropping to
//! `minReplicaCount` waits until `cooldownPeriodSeconds` have passed since
//! the last active tick. If every trigger is unavailable the previous
//! decision is held and the executor is not called.

pub mod aggregate;
pub mod cooldown;
pub mod engine;
pub mod executor;
pub mod report;
pub mod scale_loop;

pub use aggregate::{aggregate, Aggregate};
pub use cooldown::{CooldownController, CooldownState};
pub use engine::ScaleEngine;
pub use executor::{BoxFuture, CallbackExecutor, ScaleCallback, ScalingExecutor};
pub use report::TickReport;
pub use scale_loop::ScaleLoop;
