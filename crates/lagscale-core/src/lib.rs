//! lagscale-core — shared types for the lagscale autoscaling engine.
//!
//! Defines the declarative description of a scalable workload
//! (`ScalableObject` + `TriggerSpec`), the validated form that scale
//! loops consume (`ResolvedObject`), the per-tick `ScaleDecision`, the
//! TOML configuration file, and the error taxonomy shared by every crate.
//!
//! # Validation
//!
//! ```text
//! ScalableObject ──resolve()──► ResolvedObject
//!   (raw config)                  ├── limits checked (min ≤ max, max > 0)
//!                                 ├── polling interval > 0
//!                                 └── ResolvedTrigger per trigger
//!                                     └── LagThresholds parsed from metadata
//! ```
//!
//! Only resolved objects are handed to scale loops, so malformed
//! thresholds are rejected at load time and never observed mid-tick.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{EngineConfig, EngineSettings, LoggingConfig};
pub use error::{ScaleError, ScaleResult};
pub use types::*;
