//! lagscale-trigger — metric sources and per-trigger evaluation.
//!
//! A trigger pairs a metric source (selected by the trigger's `type`)
//! with lag thresholds. Each tick the evaluator asks the source for the
//! current value and turns it into an activation signal plus a replica
//! suggestion.
//!
//! # Evaluation
//!
//! ```text
//! value     = source.metric_value(metadata)   // bounded by a timeout
//! active    = value > activationLagThreshold
//! suggested = ceil(value / lagThreshold)      // 0 while inactive
//!             max replicas when lagThreshold == 0 and value > 0
//!             clamped to [0, maxReplicaCount]
//! ```
//!
//! Failures (unknown type, unreachable source, malformed value, timeout)
//! mark only that trigger unavailable for the tick.

pub mod error;
pub mod evaluator;
pub mod memory;
pub mod registry;
pub mod source;

pub use error::SourceError;
pub use evaluator::{TriggerEvaluator, TriggerOutcome, TriggerResult};
pub use memory::InMemorySource;
pub use registry::SourceRegistry;
pub use source::MetricSource;
