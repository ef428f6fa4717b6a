//! Per-signature and per-run tracking state.

use uuid::Uuid;

/// What has been observed for one transition signature.
///
/// Each field holds the order stamp of the first observation, or `None`
/// when the event has not been seen for the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureState {
    pub started: Option<u64>,
    pub scenes_ready: Option<u64>,
    pub reset_completed: Option<u64>,
    pub before_conceal: Option<u64>,
    pub completed: Option<u64>,
    /// Reason carried by the reset event, if one arrived.
    pub reset_reason: Option<String>,
}

impl SignatureState {
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    #[must_use]
    pub fn is_scenes_ready(&self) -> bool {
        self.scenes_ready.is_some()
    }

    #[must_use]
    pub fn is_reset_completed(&self) -> bool {
        self.reset_completed.is_some()
    }

    #[must_use]
    pub fn is_before_conceal(&self) -> bool {
        self.before_conceal.is_some()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// Started and not yet completed.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.is_started() && !self.is_completed()
    }
}

/// Global run-lifecycle counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// A run start was seen without a matching end.
    pub active: bool,
    /// Ends observed since the last run start.
    pub end_count: u32,
    /// Identifier of the current (or last) run.
    pub run_id: Option<Uuid>,
    /// Order stamp of the run start.
    pub started: Option<u64>,
    /// Order stamp of the first end since that start.
    pub ended: Option<u64>,
}

impl RunCounters {
    /// Counters for a freshly started run.
    #[must_use]
    pub fn started(run_id: Uuid, stamp: u64) -> Self {
        Self {
            active: true,
            end_count: 0,
            run_id: Some(run_id),
            started: Some(stamp),
            ended: None,
        }
    }
}
