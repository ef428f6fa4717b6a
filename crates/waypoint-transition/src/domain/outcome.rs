//! Result of a transition request that did not fail.

use waypoint_core::context::TransitionContext;
use waypoint_core::event::TransitionPhase;

/// How a call to the orchestrator ended, short of an adapter failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Every phase ran and `Completed` was published.
    Completed(TransitionContext),
    /// Another transition was in flight; nothing happened.
    Rejected,
    /// The caller's cancellation signal stopped the pipeline.
    Cancelled {
        /// Last phase event published before stopping, if any.
        last_published: Option<TransitionPhase>,
    },
}

impl TransitionOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// The context of a completed transition.
    #[must_use]
    pub fn context(&self) -> Option<&TransitionContext> {
        match self {
            Self::Completed(ctx) => Some(ctx),
            Self::Rejected | Self::Cancelled { .. } => None,
        }
    }
}
