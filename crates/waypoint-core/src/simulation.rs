//! Simulation gate: named, reference-counted holds that pause simulation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Token held by the orchestrator for the duration of a scene transition.
pub const SCENE_TRANSITION_TOKEN: &str = "scene_transition";

/// Token held while the game is paused.
pub const PAUSE_TOKEN: &str = "pause";

/// Named holds that keep the simulation from advancing.
pub trait SimulationGate: Send + Sync {
    /// Takes a hold on `token`. The hold is released when the handle drops.
    fn acquire(&self, token: &str) -> GateHandle;

    /// Whether at least one hold on `token` is outstanding.
    fn is_token_active(&self, token: &str) -> bool;

    /// Number of distinct tokens currently held.
    fn active_token_count(&self) -> usize;
}

/// A single hold on a simulation-gate token.
#[must_use = "dropping the handle releases the hold immediately"]
pub struct GateHandle {
    token: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl GateHandle {
    /// Builds a handle that runs `release` once when dropped.
    pub fn new(token: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            token: token.into(),
            release: Some(Box::new(release)),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Releases the hold now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for GateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateHandle")
            .field("token", &self.token)
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// In-process reference-counted gate.
#[derive(Debug, Clone, Default)]
pub struct RefCountedGate {
    counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl RefCountedGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding holds on `token`.
    #[must_use]
    pub fn hold_count(&self, token: &str) -> usize {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
            .unwrap_or(0)
    }
}

impl SimulationGate for RefCountedGate {
    fn acquire(&self, token: &str) -> GateHandle {
        {
            let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
            *counts.entry(token.to_owned()).or_insert(0) += 1;
        }
        debug!(token, "simulation gate acquired");

        let counts = Arc::clone(&self.counts);
        let owned = token.to_owned();
        GateHandle::new(token, move || {
            let mut counts = counts.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(count) = counts.get_mut(&owned) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(&owned);
                }
            }
            debug!(token = %owned, "simulation gate released");
        })
    }

    fn is_token_active(&self, token: &str) -> bool {
        self.hold_count(token) > 0
    }

    fn active_token_count(&self) -> usize {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
