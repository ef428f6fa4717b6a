//! Wall-clock source for violation timestamps.

use chrono::{DateTime, Utc};

/// Supplies the time attached to invariant violations.
///
/// Event ordering never reads it; the verifier stamps observations with its
/// own counter.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Any `Fn() -> DateTime<Utc>` is a clock, so a host can hand in its own
/// frame or simulation time.
impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}
