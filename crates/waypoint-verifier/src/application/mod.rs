//! Application services for invariant verification.

pub mod subscriptions;
pub mod verifier;
