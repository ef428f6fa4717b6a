//! Test fade adapter.

use std::sync::Mutex;

use async_trait::async_trait;
use waypoint_core::adapters::FadeAdapter;
use waypoint_core::error::AdapterError;

/// A call received by [`RecordingFade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FadeCall {
    /// `configure_from_profile(name)`
    Configure(String),
    /// `conceal()`
    Conceal,
    /// `reveal()`
    Reveal,
}

/// A fade adapter that records calls and can be made unavailable or failing.
#[derive(Debug)]
pub struct RecordingFade {
    available: bool,
    fail_with: Option<(FadeCall, AdapterError)>,
    calls: Mutex<Vec<FadeCall>>,
}

impl RecordingFade {
    /// Creates an available fade.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: true,
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a fade whose surface does not exist.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Makes `call` fail with `error`. Only `Conceal`/`Reveal` and any
    /// `Configure(_)` are matched by variant.
    #[must_use]
    pub fn failing(mut self, call: FadeCall, error: AdapterError) -> Self {
        self.fail_with = Some((call, error));
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<FadeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: FadeCall) -> Result<(), AdapterError> {
        let matches = self.fail_with.as_ref().filter(|(failing, _)| {
            std::mem::discriminant(failing) == std::mem::discriminant(&call)
        });
        self.calls.lock().unwrap().push(call);
        match matches {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for RecordingFade {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FadeAdapter for RecordingFade {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn configure_from_profile(&self, profile: &str) -> Result<(), AdapterError> {
        self.record(FadeCall::Configure(profile.to_owned()))
    }

    async fn conceal(&self) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        self.record(FadeCall::Conceal)
    }

    async fn reveal(&self) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        self.record(FadeCall::Reveal)
    }
}
