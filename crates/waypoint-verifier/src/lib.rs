//! Waypoint — Invariant Verification bounded context.
//!
//! A passive observer of the event hub. It tracks every transition by
//! signature, plus run lifecycle and pause state, and reports ordering and
//! uniqueness violations. Nothing here feeds back into the orchestrator.

pub mod application;
pub mod domain;

pub use application::subscriptions::VerifierSubscriptions;
pub use application::verifier::{InvariantVerifier, VerifierConfig};
pub use domain::violation::{InvariantCode, InvariantFamily, Violation};
