//! Domain model for the Scene Transition context.

pub mod outcome;
pub mod plan;
