//! Waypoint Core — shared scene-transition abstractions.
//!
//! This crate defines the request/context model, the events every
//! subsystem exchanges, the typed event hub, and the collaborator traits
//! the orchestrator drives. It contains no orchestration logic.

pub mod adapters;
pub mod bus;
pub mod clock;
pub mod context;
pub mod error;
pub mod event;
pub mod request;
pub mod simulation;
