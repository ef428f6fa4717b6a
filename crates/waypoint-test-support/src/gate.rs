//! Test completion gates.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use waypoint_core::adapters::CompletionGate;
use waypoint_core::context::TransitionContext;
use waypoint_core::error::AdapterError;

/// A gate that passes immediately and records the signatures it saw.
#[derive(Debug, Default)]
pub struct RecordingCompletionGate {
    seen: Mutex<Vec<String>>,
}

impl RecordingCompletionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn signatures(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGate for RecordingCompletionGate {
    async fn await_before_reveal(&self, context: &TransitionContext) -> Result<(), AdapterError> {
        self.seen.lock().unwrap().push(context.signature().to_owned());
        Ok(())
    }
}

/// A gate that fails immediately, without suspending.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCompletionGate;

#[async_trait]
impl CompletionGate for FailingCompletionGate {
    async fn await_before_reveal(&self, _context: &TransitionContext) -> Result<(), AdapterError> {
        Err(AdapterError::Failed("world reset subsystem offline".into()))
    }
}

/// A gate that never opens. `entered()` fires once the orchestrator is
/// waiting on it.
#[derive(Debug, Default)]
pub struct PendingCompletionGate {
    entered: Arc<Notify>,
}

impl PendingCompletionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notified when a transition starts waiting on the gate.
    #[must_use]
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }
}

#[async_trait]
impl CompletionGate for PendingCompletionGate {
    async fn await_before_reveal(&self, _context: &TransitionContext) -> Result<(), AdapterError> {
        self.entered.notify_one();
        std::future::pending::<()>().await;
        Ok(())
    }
}
