//! Shared wiring for host integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use waypoint_core::adapters::CompletionGate;
use waypoint_core::bus::{EventBus, EventHub};
use waypoint_core::context::TransitionContext;
use waypoint_core::error::AdapterError;
use waypoint_core::event::ResetCompleted;
use waypoint_host::{Collaborators, Settings, TransitionRuntime};
use waypoint_test_support::{RecordingFade, RecordingSceneLoader};

/// Stands in for the world-reset subsystem: announces the reset for the
/// transition's signature, then lets the reveal go ahead.
pub struct ResettingCompletionGate {
    resets: EventBus<ResetCompleted>,
}

impl ResettingCompletionGate {
    pub fn new(resets: EventBus<ResetCompleted>) -> Self {
        Self { resets }
    }
}

#[async_trait]
impl CompletionGate for ResettingCompletionGate {
    async fn await_before_reveal(&self, context: &TransitionContext) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        self.resets
            .publish(&ResetCompleted::new(context.signature(), "scene transition"));
        Ok(())
    }
}

pub struct Harness {
    pub runtime: TransitionRuntime,
    pub loader: Arc<RecordingSceneLoader>,
    pub fade: Arc<RecordingFade>,
}

/// A runtime over a loader holding `A` (active), with a reset-publishing
/// completion gate.
pub fn harness(settings: &Settings) -> Harness {
    let hub = EventHub::new();
    let loader = Arc::new(RecordingSceneLoader::new(["A"], "A"));
    let fade = Arc::new(RecordingFade::new());
    let gate = Arc::new(ResettingCompletionGate::new(hub.resets.clone()));
    let collaborators = Collaborators::new(loader.clone())
        .fade(fade.clone())
        .completion_gate(gate);
    let runtime = TransitionRuntime::init(settings, hub, collaborators)
        .expect("runtime initialises on a fresh hub");
    Harness {
        runtime,
        loader,
        fade,
    }
}

/// A runtime with no completion gate, so no reset is ever announced.
pub fn harness_without_reset(settings: &Settings) -> Harness {
    let hub = EventHub::new();
    let loader = Arc::new(RecordingSceneLoader::new(["A"], "A"));
    let fade = Arc::new(RecordingFade::new());
    let collaborators = Collaborators::new(loader.clone()).fade(fade.clone());
    let runtime = TransitionRuntime::init(settings, hub, collaborators)
        .expect("runtime initialises on a fresh hub");
    Harness {
        runtime,
        loader,
        fade,
    }
}
