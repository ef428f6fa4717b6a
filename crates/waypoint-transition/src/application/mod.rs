//! Application services for the Scene Transition context.

pub mod orchestrator;
