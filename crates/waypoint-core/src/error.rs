//! Error types shared by the orchestrator and its collaborators.

use thiserror::Error;

/// Failure reported by a collaborator (loader, fade, completion gate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The collaborator failed unexpectedly.
    #[error("{0}")]
    Failed(String),

    /// The collaborator observed its own cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// The collaborator gave up after its own timeout.
    #[error("timed out: {0}")]
    TimedOut(String),
}

/// Loader operation that was in flight when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderOperation {
    /// Loading a scene.
    Load,
    /// Unloading a scene.
    Unload,
    /// Switching the foreground scene.
    SetActive,
    /// Querying loader state.
    Query,
}

impl std::fmt::Display for LoaderOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::SetActive => "set_active",
            Self::Query => "query",
        };
        f.write_str(name)
    }
}

/// Fade operation that was in flight when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOperation {
    /// Applying a named profile.
    Configure,
    /// Covering the screen.
    Conceal,
    /// Uncovering the screen.
    Reveal,
}

impl std::fmt::Display for FadeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configure => "configure",
            Self::Conceal => "conceal",
            Self::Reveal => "reveal",
        };
        f.write_str(name)
    }
}

/// Errors that abort a scene transition and reach the caller.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The scene loader failed.
    #[error("scene loader {operation} failed for '{scene}': {source}")]
    Loader {
        /// The loader operation that failed.
        operation: LoaderOperation,
        /// The scene the operation targeted.
        scene: String,
        /// The underlying collaborator error.
        #[source]
        source: AdapterError,
    },

    /// The fade adapter failed.
    #[error("fade {operation} failed: {source}")]
    Fade {
        /// The fade operation that failed.
        operation: FadeOperation,
        /// The underlying collaborator error.
        #[source]
        source: AdapterError,
    },
}

impl TransitionError {
    /// Returns the collaborator error behind this failure.
    #[must_use]
    pub fn adapter_error(&self) -> &AdapterError {
        match self {
            Self::Loader { source, .. } | Self::Fade { source, .. } => source,
        }
    }

    /// True when the collaborator reported its own cancellation or timeout.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self.adapter_error(),
            AdapterError::Cancelled | AdapterError::TimedOut(_)
        )
    }
}
