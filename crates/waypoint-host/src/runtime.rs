//! Transition runtime — owns the hub, the orchestrator and the verifier.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use waypoint_core::adapters::{CompletionGate, FadeAdapter, LoadingIndicator, SceneLoader};
use waypoint_core::bus::EventHub;
use waypoint_core::error::TransitionError;
use waypoint_core::request::TransitionRequest;
use waypoint_core::simulation::{RefCountedGate, SimulationGate};
use waypoint_transition::{TransitionOrchestrator, TransitionOutcome};
use waypoint_verifier::{InvariantVerifier, VerifierSubscriptions};

use crate::config::Settings;
use crate::error::HostError;

/// The host-side collaborators handed to the orchestrator.
pub struct Collaborators {
    loader: Arc<dyn SceneLoader>,
    fade: Option<Arc<dyn FadeAdapter>>,
    completion_gate: Option<Arc<dyn CompletionGate>>,
    loading_indicator: Option<Arc<dyn LoadingIndicator>>,
    simulation_gate: Arc<dyn SimulationGate>,
}

impl Collaborators {
    /// Starts from a scene loader with an in-process simulation gate.
    #[must_use]
    pub fn new(loader: Arc<dyn SceneLoader>) -> Self {
        Self {
            loader,
            fade: None,
            completion_gate: None,
            loading_indicator: None,
            simulation_gate: Arc::new(RefCountedGate::new()),
        }
    }

    #[must_use]
    pub fn fade(mut self, fade: Arc<dyn FadeAdapter>) -> Self {
        self.fade = Some(fade);
        self
    }

    #[must_use]
    pub fn completion_gate(mut self, gate: Arc<dyn CompletionGate>) -> Self {
        self.completion_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.loading_indicator = Some(indicator);
        self
    }

    /// Replaces the default gate. The orchestrator and the verifier share it.
    #[must_use]
    pub fn simulation_gate(mut self, gate: Arc<dyn SimulationGate>) -> Self {
        self.simulation_gate = gate;
        self
    }
}

/// Everything a running application needs to drive scene transitions.
///
/// Created once at startup with [`TransitionRuntime::init`] and torn down
/// with [`TransitionRuntime::shutdown`].
pub struct TransitionRuntime {
    hub: EventHub,
    orchestrator: TransitionOrchestrator,
    simulation_gate: Arc<dyn SimulationGate>,
    verifier: Option<Arc<InvariantVerifier>>,
    verifier_subscriptions: Option<VerifierSubscriptions>,
}

impl TransitionRuntime {
    /// Wires the orchestrator to `hub` and, when enabled, attaches the
    /// invariant verifier to every bus on it.
    ///
    /// The hub is created by the caller so collaborators that publish on
    /// it (such as a world-reset subsystem) can be built first.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Bus` if the hub is already shut down.
    pub fn init(
        settings: &Settings,
        hub: EventHub,
        collaborators: Collaborators,
    ) -> Result<Self, HostError> {
        let Collaborators {
            loader,
            fade,
            completion_gate,
            loading_indicator,
            simulation_gate,
        } = collaborators;

        let (verifier, verifier_subscriptions) = if settings.verifier_enabled {
            let verifier = Arc::new(
                InvariantVerifier::new(settings.verifier_config())
                    .with_simulation_gate(Arc::clone(&simulation_gate)),
            );
            let subscriptions = verifier.attach(&hub)?;
            (Some(verifier), Some(subscriptions))
        } else {
            (None, None)
        };

        let mut builder = TransitionOrchestrator::builder(loader, hub.transitions.clone())
            .simulation_gate(Arc::clone(&simulation_gate))
            .options(settings.orchestrator_options());
        if let Some(fade) = fade {
            builder = builder.fade(fade);
        }
        if let Some(gate) = completion_gate {
            builder = builder.completion_gate(gate);
        }
        if let Some(indicator) = loading_indicator {
            builder = builder.loading_indicator(indicator);
        }

        info!(
            verifier = settings.verifier_enabled,
            strict = settings.strict_invariants,
            "transition runtime initialised"
        );

        Ok(Self {
            hub,
            orchestrator: builder.build(),
            simulation_gate,
            verifier,
            verifier_subscriptions,
        })
    }

    #[must_use]
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    #[must_use]
    pub fn orchestrator(&self) -> &TransitionOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn simulation_gate(&self) -> &Arc<dyn SimulationGate> {
        &self.simulation_gate
    }

    /// The attached verifier, if enabled.
    #[must_use]
    pub fn verifier(&self) -> Option<&Arc<InvariantVerifier>> {
        self.verifier.as_ref()
    }

    /// Runs one transition.
    ///
    /// # Errors
    ///
    /// See [`TransitionOrchestrator::run`].
    pub async fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.orchestrator.run(request).await
    }

    /// Runs one transition that stops at the next phase boundary once
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`TransitionOrchestrator::run_with_cancellation`].
    pub async fn transition_with_cancellation(
        &self,
        request: TransitionRequest,
        cancel: &CancellationToken,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.orchestrator.run_with_cancellation(request, cancel).await
    }

    /// Detaches the verifier and closes every bus on the hub.
    ///
    /// Returns the verifier so its report can still be read.
    pub fn shutdown(self) -> Option<Arc<InvariantVerifier>> {
        if let Some(subscriptions) = self.verifier_subscriptions {
            subscriptions.detach();
        }
        self.hub.shutdown();

        let violations = self
            .verifier
            .as_ref()
            .map_or(0, |verifier| verifier.violation_count());
        info!(violations, "transition runtime shut down");
        self.verifier
    }
}
