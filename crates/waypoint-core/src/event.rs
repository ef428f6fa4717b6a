//! Events exchanged over the hub.
//!
//! Phase events are the only thing the orchestrator emits. Reset, run and
//! pause events come from other subsystems and are observed by the
//! invariant verifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::TransitionContext;

/// Signature used for a reset event that arrived without one.
pub const MISSING_SIGNATURE: &str = "<missing-signature>";

/// Event type identifier for [`TransitionEvent::Started`].
pub const TRANSITION_STARTED_EVENT_TYPE: &str = "transition.started";

/// Event type identifier for [`TransitionEvent::ScenesReady`].
pub const TRANSITION_SCENES_READY_EVENT_TYPE: &str = "transition.scenes_ready";

/// Event type identifier for [`TransitionEvent::BeforeConceal`].
pub const TRANSITION_BEFORE_CONCEAL_EVENT_TYPE: &str = "transition.before_conceal";

/// Event type identifier for [`TransitionEvent::Completed`].
pub const TRANSITION_COMPLETED_EVENT_TYPE: &str = "transition.completed";

/// Event type identifier for [`ResetCompleted`].
pub const RESET_COMPLETED_EVENT_TYPE: &str = "world_reset.completed";

/// Event type identifier for [`RunLifecycleEvent::Started`].
pub const RUN_STARTED_EVENT_TYPE: &str = "run.started";

/// Event type identifier for [`RunLifecycleEvent::Ended`].
pub const RUN_ENDED_EVENT_TYPE: &str = "run.ended";

/// Event type identifier for [`PauseEvent::PauseCommand`].
pub const PAUSE_COMMAND_EVENT_TYPE: &str = "pause.command";

/// Event type identifier for [`PauseEvent::ResumeRequested`].
pub const RESUME_REQUESTED_EVENT_TYPE: &str = "pause.resume_requested";

/// Trait that all hub events implement.
pub trait HubEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;
}

/// Orchestrator phases, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransitionPhase {
    /// Transition accepted and context built.
    Started,
    /// All scene adds/removes are done.
    ScenesReady,
    /// Completion gate passed; reveal is next.
    BeforeConceal,
    /// Transition finished.
    Completed,
}

/// Phase event published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionEvent {
    /// A transition has started.
    Started(TransitionContext),
    /// Scene work is done.
    ScenesReady(TransitionContext),
    /// About to reveal (pre-reveal hold).
    BeforeConceal(TransitionContext),
    /// The transition is complete.
    Completed(TransitionContext),
}

impl TransitionEvent {
    /// Builds the event for `phase`.
    #[must_use]
    pub fn new(phase: TransitionPhase, context: TransitionContext) -> Self {
        match phase {
            TransitionPhase::Started => Self::Started(context),
            TransitionPhase::ScenesReady => Self::ScenesReady(context),
            TransitionPhase::BeforeConceal => Self::BeforeConceal(context),
            TransitionPhase::Completed => Self::Completed(context),
        }
    }

    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        match self {
            Self::Started(_) => TransitionPhase::Started,
            Self::ScenesReady(_) => TransitionPhase::ScenesReady,
            Self::BeforeConceal(_) => TransitionPhase::BeforeConceal,
            Self::Completed(_) => TransitionPhase::Completed,
        }
    }

    #[must_use]
    pub fn context(&self) -> &TransitionContext {
        match self {
            Self::Started(ctx)
            | Self::ScenesReady(ctx)
            | Self::BeforeConceal(ctx)
            | Self::Completed(ctx) => ctx,
        }
    }

    #[must_use]
    pub fn signature(&self) -> &str {
        self.context().signature()
    }
}

impl HubEvent for TransitionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Started(_) => TRANSITION_STARTED_EVENT_TYPE,
            Self::ScenesReady(_) => TRANSITION_SCENES_READY_EVENT_TYPE,
            Self::BeforeConceal(_) => TRANSITION_BEFORE_CONCEAL_EVENT_TYPE,
            Self::Completed(_) => TRANSITION_COMPLETED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Emitted by the world-reset subsystem once its work for a transition is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCompleted {
    /// Signature of the transition the reset belongs to.
    pub signature: Option<String>,
    /// Free-text reason supplied by the reset subsystem.
    pub reason: String,
}

impl ResetCompleted {
    /// Creates a reset event for `signature`.
    #[must_use]
    pub fn new(signature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            signature: Some(signature.into()),
            reason: reason.into(),
        }
    }

    /// Signature to correlate on, or [`MISSING_SIGNATURE`] when absent or blank.
    #[must_use]
    pub fn correlation_key(&self) -> &str {
        match self.signature.as_deref() {
            Some(sig) if !sig.trim().is_empty() => sig,
            _ => MISSING_SIGNATURE,
        }
    }
}

impl HubEvent for ResetCompleted {
    fn event_type(&self) -> &'static str {
        RESET_COMPLETED_EVENT_TYPE
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Run start/end notifications from the game-loop state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunLifecycleEvent {
    /// A run has started.
    Started {
        /// The run identifier.
        run_id: Uuid,
        /// State the game loop entered for the run.
        state_id: String,
    },
    /// A run has ended.
    Ended {
        /// The run identifier, when the emitter knows it.
        run_id: Option<Uuid>,
        /// Why the run ended.
        reason: String,
    },
}

impl HubEvent for RunLifecycleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => RUN_STARTED_EVENT_TYPE,
            Self::Ended { .. } => RUN_ENDED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Pause and resume notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseEvent {
    /// Pause toggled; `paused == false` releases the pause.
    PauseCommand {
        /// Requested pause state.
        paused: bool,
    },
    /// Resume was requested explicitly.
    ResumeRequested,
}

impl PauseEvent {
    /// True when this event releases a pause.
    #[must_use]
    pub fn is_release(&self) -> bool {
        matches!(
            self,
            Self::ResumeRequested | Self::PauseCommand { paused: false }
        )
    }
}

impl HubEvent for PauseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::PauseCommand { .. } => PAUSE_COMMAND_EVENT_TYPE,
            Self::ResumeRequested => RESUME_REQUESTED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
