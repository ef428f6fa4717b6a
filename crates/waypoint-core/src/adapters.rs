//! Collaborators the orchestrator drives.
//!
//! Concrete implementations live with the engine integration; this crate
//! only fixes their contracts.

use async_trait::async_trait;

use crate::context::TransitionContext;
use crate::error::AdapterError;

/// Adds, removes and foregrounds scenes.
///
/// Soft failures (a scene that cannot be foregrounded) are reported through
/// return values. `Err` is reserved for unexpected faults and aborts the
/// transition.
#[async_trait]
pub trait SceneLoader: Send + Sync {
    /// Loads `name` additively.
    async fn load_scene(&self, name: &str) -> Result<(), AdapterError>;

    /// Unloads `name`.
    async fn unload_scene(&self, name: &str) -> Result<(), AdapterError>;

    /// Whether `name` is currently loaded.
    async fn is_scene_loaded(&self, name: &str) -> Result<bool, AdapterError>;

    /// Makes `name` the foreground scene. `Ok(false)` means the engine refused.
    async fn try_set_active_scene(&self, name: &str) -> Result<bool, AdapterError>;

    /// Name of the current foreground scene.
    async fn active_scene_name(&self) -> Result<String, AdapterError>;
}

/// Visual conceal/reveal effect.
#[async_trait]
pub trait FadeAdapter: Send + Sync {
    /// Whether a fade surface exists right now.
    fn is_available(&self) -> bool;

    /// Applies the named visual profile to the next conceal/reveal pair.
    async fn configure_from_profile(&self, profile: &str) -> Result<(), AdapterError>;

    /// Covers the screen.
    async fn conceal(&self) -> Result<(), AdapterError>;

    /// Uncovers the screen.
    async fn reveal(&self) -> Result<(), AdapterError>;
}

/// Rendezvous awaited once per transition, between `ScenesReady` and
/// `BeforeConceal`.
///
/// Failures are tolerated by the orchestrator: they are logged and the
/// transition proceeds.
#[async_trait]
pub trait CompletionGate: Send + Sync {
    /// Waits until work that must precede the reveal of `context` is done.
    async fn await_before_reveal(&self, context: &TransitionContext) -> Result<(), AdapterError>;
}

/// Gate for environments with nothing to synchronise on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompletionGate;

#[async_trait]
impl CompletionGate for NoopCompletionGate {
    async fn await_before_reveal(&self, _context: &TransitionContext) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// On-screen loading indicator shown while scenes are swapped.
pub trait LoadingIndicator: Send + Sync {
    /// Shows the indicator for `context`.
    fn show(&self, context: &TransitionContext);

    /// Hides the indicator. Called at most once per `show`.
    fn hide(&self);
}
