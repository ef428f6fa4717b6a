//! Event recorder — captures everything published on a bus.

use std::sync::{Arc, Mutex};

use waypoint_core::bus::{EventBus, Subscription};
use waypoint_core::event::{TransitionEvent, TransitionPhase};

/// Subscribes to a bus and keeps every event it delivers.
#[derive(Debug)]
pub struct EventRecorder<E> {
    events: Arc<Mutex<Vec<E>>>,
    _subscription: Subscription,
}

impl<E: Clone + Send + Sync + 'static> EventRecorder<E> {
    /// Starts recording `bus`.
    ///
    /// # Panics
    ///
    /// Panics if the bus is already shut down.
    #[must_use]
    pub fn attach(bus: &EventBus<E>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = bus
            .subscribe(move |event: &E| sink.lock().unwrap().push(event.clone()))
            .expect("recorder attached to a shut-down bus");
        Self {
            events,
            _subscription: subscription,
        }
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }
}

impl EventRecorder<TransitionEvent> {
    /// The phases seen so far, in delivery order.
    pub fn phases(&self) -> Vec<TransitionPhase> {
        self.events().iter().map(TransitionEvent::phase).collect()
    }
}
