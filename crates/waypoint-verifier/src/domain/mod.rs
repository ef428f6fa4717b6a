//! Domain model for invariant verification.

pub mod state;
pub mod violation;
