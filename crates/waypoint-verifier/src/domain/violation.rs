//! Invariant violations.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Signature attached to violations that are not about one transition.
pub const GLOBAL_SIGNATURE: &str = "<global>";

/// Families of independent invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InvariantFamily {
    /// The scene-transition token is held on `Started` and free on `Completed`.
    GateToken,
    /// Phase ordering per signature.
    PhaseOrder,
    /// World-reset correlation.
    ResetCorrelation,
    /// Run starts.
    RunStart,
    /// Run ends.
    RunEnd,
    /// Pause token released on resume.
    PauseToken,
}

impl InvariantFamily {
    /// Short tag used in logs.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::GateToken => "gate_token",
            Self::PhaseOrder => "phase_order",
            Self::ResetCorrelation => "reset",
            Self::RunStart => "run_start",
            Self::RunEnd => "run_end",
            Self::PauseToken => "pause_token",
        }
    }
}

/// A specific broken invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InvariantCode {
    TokenNotHeldOnStarted,
    TokenHeldOnCompleted,
    ScenesReadyBeforeStarted,
    CompletedBeforeScenesReady,
    OverlappingStart,
    DuplicateReset,
    ResetBeforeScenesReady,
    ResetAfterBeforeConceal,
    BeforeConcealWithoutReset,
    CompletedWithoutReset,
    RunStartWhileActive,
    UnexpectedRunState,
    RunEndWithoutRun,
    DuplicateRunEnd,
    PauseTokenHeldAfterResume,
}

impl InvariantCode {
    #[must_use]
    pub fn family(self) -> InvariantFamily {
        match self {
            Self::TokenNotHeldOnStarted | Self::TokenHeldOnCompleted => InvariantFamily::GateToken,
            Self::ScenesReadyBeforeStarted
            | Self::CompletedBeforeScenesReady
            | Self::OverlappingStart => InvariantFamily::PhaseOrder,
            Self::DuplicateReset
            | Self::ResetBeforeScenesReady
            | Self::ResetAfterBeforeConceal
            | Self::BeforeConcealWithoutReset
            | Self::CompletedWithoutReset => InvariantFamily::ResetCorrelation,
            Self::RunStartWhileActive | Self::UnexpectedRunState => InvariantFamily::RunStart,
            Self::RunEndWithoutRun | Self::DuplicateRunEnd => InvariantFamily::RunEnd,
            Self::PauseTokenHeldAfterResume => InvariantFamily::PauseToken,
        }
    }

    /// Stable short code, e.g. `reset.duplicate`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenNotHeldOnStarted => "gate_token.not_held_on_started",
            Self::TokenHeldOnCompleted => "gate_token.held_on_completed",
            Self::ScenesReadyBeforeStarted => "phase_order.scenes_ready_before_started",
            Self::CompletedBeforeScenesReady => "phase_order.completed_before_scenes_ready",
            Self::OverlappingStart => "phase_order.overlapping_start",
            Self::DuplicateReset => "reset.duplicate",
            Self::ResetBeforeScenesReady => "reset.before_scenes_ready",
            Self::ResetAfterBeforeConceal => "reset.after_before_conceal",
            Self::BeforeConcealWithoutReset => "reset.before_conceal_without_reset",
            Self::CompletedWithoutReset => "reset.completed_without_reset",
            Self::RunStartWhileActive => "run_start.while_active",
            Self::UnexpectedRunState => "run_start.unexpected_state",
            Self::RunEndWithoutRun => "run_end.without_run",
            Self::DuplicateRunEnd => "run_end.duplicate",
            Self::PauseTokenHeldAfterResume => "pause_token.held_after_resume",
        }
    }
}

impl std::fmt::Display for InvariantCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Transition signature, or [`GLOBAL_SIGNATURE`].
    pub signature: String,
    /// Which invariant broke.
    pub code: InvariantCode,
    /// Human-readable explanation.
    pub message: String,
    /// Raw payload of the event that exposed the violation.
    pub detail: String,
    /// When the verifier observed it.
    pub observed_at: DateTime<Utc>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} (signature: {}) {}",
            self.code, self.message, self.signature, self.detail
        )
    }
}
