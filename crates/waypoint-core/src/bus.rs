//! Typed publish/subscribe channels.
//!
//! Each [`EventBus`] fans one event type out to its subscribers
//! synchronously, on the publishing task. Subscribers keep the
//! [`Subscription`] handed out at subscribe time and detach through it.
//! Delivery order across subscribers is not part of the contract.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;
use tracing::debug;

use crate::event::{PauseEvent, ResetCompleted, RunLifecycleEvent, TransitionEvent};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Errors raised by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The bus was shut down and accepts no new subscribers.
    #[error("event bus '{0}' is shut down")]
    ShutDown(&'static str),
}

struct Registry<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
    closed: bool,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<E: 'static> Detach for Mutex<Registry<E>> {
    fn detach(&self, id: u64) {
        let mut registry = self.lock().unwrap_or_else(PoisonError::into_inner);
        registry.handlers.retain(|(handler_id, _)| *handler_id != id);
    }
}

/// A typed fan-out channel.
pub struct EventBus<E> {
    name: &'static str,
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<E: Send + Sync + 'static> EventBus<E> {
    /// Creates an open bus. `name` only shows up in logs and errors.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Registers `handler` and returns the handle that removes it again.
    ///
    /// # Errors
    ///
    /// Returns `BusError::ShutDown` once [`EventBus::shutdown`] has run.
    pub fn subscribe<F>(&self, handler: F) -> Result<Subscription, BusError>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.lock();
            if registry.closed {
                return Err(BusError::ShutDown(self.name));
            }
            registry.next_id += 1;
            let id = registry.next_id;
            registry.handlers.push((id, Arc::new(handler)));
            id
        };

        let detach: Arc<dyn Detach> = self.registry.clone();
        Ok(Subscription {
            bus: self.name,
            id,
            registry: Some(Arc::downgrade(&detach)),
        })
    }

    /// Delivers `event` to every current subscriber and returns how many
    /// received it.
    ///
    /// Handlers run outside the registry lock, so they may publish or
    /// unsubscribe themselves.
    pub fn publish(&self, event: &E) -> usize {
        let handlers: Vec<Handler<E>> = {
            let registry = self.lock();
            if registry.closed {
                debug!(bus = self.name, "dropping event published after shutdown");
                return 0;
            }
            registry.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    /// Drops every subscriber and closes the bus.
    pub fn shutdown(&self) {
        let mut registry = self.lock();
        registry.closed = true;
        registry.handlers.clear();
        debug!(bus = self.name, "event bus shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one registered subscriber. Dropping it unsubscribes.
pub struct Subscription {
    bus: &'static str,
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Name of the bus this subscription belongs to.
    #[must_use]
    pub fn bus(&self) -> &'static str {
        self.bus
    }

    /// Removes the subscriber. Harmless if the bus is already gone.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("bus", &self.bus)
            .field("id", &self.id)
            .finish()
    }
}

/// The set of buses a running application shares.
///
/// Owned by the composition root; components receive clones of the buses
/// they need.
#[derive(Debug, Clone)]
pub struct EventHub {
    /// Orchestrator phase events.
    pub transitions: EventBus<TransitionEvent>,
    /// World-reset completions.
    pub resets: EventBus<ResetCompleted>,
    /// Run start/end.
    pub runs: EventBus<RunLifecycleEvent>,
    /// Pause/resume.
    pub pauses: EventBus<PauseEvent>,
}

impl EventHub {
    /// Creates a hub with four open buses.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transitions: EventBus::new("transitions"),
            resets: EventBus::new("resets"),
            runs: EventBus::new("runs"),
            pauses: EventBus::new("pauses"),
        }
    }

    /// Shuts every bus down.
    pub fn shutdown(&self) {
        self.transitions.shutdown();
        self.resets.shutdown();
        self.runs.shutdown();
        self.pauses.shutdown();
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
