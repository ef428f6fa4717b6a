//! Waypoint — Scene Transition bounded context.
//!
//! Drives one transition at a time through `Started`, `ScenesReady`,
//! `BeforeConceal` and `Completed`, calling the scene loader, fade and
//! completion gate in between.

pub mod application;
pub mod domain;

pub use application::orchestrator::{
    OrchestratorOptions, TransitionOrchestrator, TransitionOrchestratorBuilder,
};
pub use domain::outcome::TransitionOutcome;
