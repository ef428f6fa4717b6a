//! Wiring the verifier onto an event hub.

use std::sync::Arc;

use waypoint_core::bus::{BusError, EventHub, Subscription};

use super::verifier::InvariantVerifier;

/// The verifier's four hub subscriptions. Dropping this detaches it.
#[derive(Debug)]
pub struct VerifierSubscriptions {
    subscriptions: Vec<Subscription>,
}

impl VerifierSubscriptions {
    /// Detaches the verifier from every bus.
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl InvariantVerifier {
    /// Subscribes the verifier to phase, reset, run and pause events.
    ///
    /// # Errors
    ///
    /// Returns `BusError::ShutDown` if any bus of the hub is already shut
    /// down; subscriptions made before the failure are dropped again.
    pub fn attach(self: &Arc<Self>, hub: &EventHub) -> Result<VerifierSubscriptions, BusError> {
        let transitions = {
            let verifier = Arc::clone(self);
            hub.transitions.subscribe(move |event| {
                verifier.observe_transition(event);
            })?
        };
        let resets = {
            let verifier = Arc::clone(self);
            hub.resets.subscribe(move |event| {
                verifier.observe_reset(event);
            })?
        };
        let runs = {
            let verifier = Arc::clone(self);
            hub.runs.subscribe(move |event| {
                verifier.observe_run(event);
            })?
        };
        let pauses = {
            let verifier = Arc::clone(self);
            hub.pauses.subscribe(move |event| {
                verifier.observe_pause(event);
            })?
        };

        Ok(VerifierSubscriptions {
            subscriptions: vec![transitions, resets, runs, pauses],
        })
    }
}
