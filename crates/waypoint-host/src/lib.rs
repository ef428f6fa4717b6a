//! Waypoint host — the composition root.
//!
//! Reads settings from the environment, installs the tracing subscriber,
//! and owns the event hub, orchestrator and (optionally) the invariant
//! verifier for the lifetime of the application.

pub mod config;
pub mod error;
pub mod runtime;
pub mod telemetry;

pub use config::Settings;
pub use error::HostError;
pub use runtime::{Collaborators, TransitionRuntime};
