//! Test scene loader — records every mutating call.

use std::sync::Mutex;

use async_trait::async_trait;
use waypoint_core::adapters::SceneLoader;
use waypoint_core::error::AdapterError;

/// A mutating call received by [`RecordingSceneLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    /// `load_scene(name)`
    Load(String),
    /// `unload_scene(name)`
    Unload(String),
    /// `try_set_active_scene(name)`
    SetActive(String),
}

#[derive(Debug, Default)]
struct LoaderState {
    loaded: Vec<String>,
    active: String,
    calls: Vec<LoaderCall>,
    fail_load: Option<String>,
    fail_unload: Option<String>,
    refuse_activation: bool,
}

type CallHook = Box<dyn Fn(&LoaderCall) + Send + Sync>;

/// An in-memory scene loader that records load/unload/activate calls.
///
/// Every mutating call yields to the scheduler first, so concurrent
/// transitions interleave the way they would against a real engine.
#[derive(Default)]
pub struct RecordingSceneLoader {
    state: Mutex<LoaderState>,
    after_call: Option<CallHook>,
}

impl std::fmt::Debug for RecordingSceneLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSceneLoader")
            .field("state", &self.state)
            .field("has_hook", &self.after_call.is_some())
            .finish()
    }
}

impl RecordingSceneLoader {
    /// Creates a loader with `loaded` already present and `active` in the
    /// foreground.
    #[must_use]
    pub fn new<I, S>(loaded: I, active: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(LoaderState {
                loaded: loaded.into_iter().map(Into::into).collect(),
                active: active.to_owned(),
                ..LoaderState::default()
            }),
            after_call: None,
        }
    }

    /// Makes `load_scene(scene)` fail.
    #[must_use]
    pub fn failing_load(self, scene: &str) -> Self {
        self.state.lock().unwrap().fail_load = Some(scene.to_owned());
        self
    }

    /// Makes `unload_scene(scene)` fail.
    #[must_use]
    pub fn failing_unload(self, scene: &str) -> Self {
        self.state.lock().unwrap().fail_unload = Some(scene.to_owned());
        self
    }

    /// Makes `try_set_active_scene` return `Ok(false)`.
    #[must_use]
    pub fn refusing_activation(self) -> Self {
        self.state.lock().unwrap().refuse_activation = true;
        self
    }

    /// Runs `hook` after every mutating call has been applied, e.g. to fire
    /// a cancellation token mid-transition.
    #[must_use]
    pub fn after_call(mut self, hook: impl Fn(&LoaderCall) + Send + Sync + 'static) -> Self {
        self.after_call = Some(Box::new(hook));
        self
    }

    fn notify(&self, call: &LoaderCall) {
        if let Some(hook) = &self.after_call {
            hook(call);
        }
    }

    /// Returns a snapshot of the recorded calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<LoaderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Returns the scenes currently loaded, in load order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loaded_scenes(&self) -> Vec<String> {
        self.state.lock().unwrap().loaded.clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn active_scene(&self) -> String {
        self.state.lock().unwrap().active.clone()
    }
}

#[async_trait]
impl SceneLoader for RecordingSceneLoader {
    async fn load_scene(&self, name: &str) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        let call = LoaderCall::Load(name.to_owned());
        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            if state.fail_load.as_deref() == Some(name) {
                Err(AdapterError::Failed(format!("scene '{name}' is missing")))
            } else {
                if !state.loaded.iter().any(|s| s == name) {
                    state.loaded.push(name.to_owned());
                }
                Ok(())
            }
        };
        self.notify(&call);
        result
    }

    async fn unload_scene(&self, name: &str) -> Result<(), AdapterError> {
        tokio::task::yield_now().await;
        let call = LoaderCall::Unload(name.to_owned());
        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            if state.fail_unload.as_deref() == Some(name) {
                Err(AdapterError::Failed(format!("scene '{name}' refused to unload")))
            } else {
                state.loaded.retain(|s| s != name);
                Ok(())
            }
        };
        self.notify(&call);
        result
    }

    async fn is_scene_loaded(&self, name: &str) -> Result<bool, AdapterError> {
        Ok(self.state.lock().unwrap().loaded.iter().any(|s| s == name))
    }

    async fn try_set_active_scene(&self, name: &str) -> Result<bool, AdapterError> {
        tokio::task::yield_now().await;
        let call = LoaderCall::SetActive(name.to_owned());
        let switched = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            let allowed = !state.refuse_activation && state.loaded.iter().any(|s| s == name);
            if allowed {
                state.active = name.to_owned();
            }
            allowed
        };
        self.notify(&call);
        Ok(switched)
    }

    async fn active_scene_name(&self) -> Result<String, AdapterError> {
        Ok(self.state.lock().unwrap().active.clone())
    }
}
