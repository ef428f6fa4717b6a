//! The transition orchestrator.
//!
//! One orchestrator drives at most one transition at a time. Overlapping
//! calls are turned away by a two-layer guard: an atomic flag for the cheap
//! common case, then a single-permit semaphore acquired without waiting.
//! Both are released on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use waypoint_core::adapters::{
    CompletionGate, FadeAdapter, LoadingIndicator, NoopCompletionGate, SceneLoader,
};
use waypoint_core::bus::EventBus;
use waypoint_core::context::TransitionContext;
use waypoint_core::error::{AdapterError, FadeOperation, LoaderOperation, TransitionError};
use waypoint_core::event::{TransitionEvent, TransitionPhase};
use waypoint_core::request::TransitionRequest;
use waypoint_core::simulation::{GateHandle, SCENE_TRANSITION_TOKEN, SimulationGate};

use crate::domain::outcome::TransitionOutcome;
use crate::domain::plan::{foreground_scene, resolve_plan};

/// Tunables for the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Fade profile applied when a request names none.
    pub default_fade_profile: Option<String>,
}

/// Drives scene transitions end to end.
pub struct TransitionOrchestrator {
    loader: Arc<dyn SceneLoader>,
    fade: Option<Arc<dyn FadeAdapter>>,
    completion_gate: Arc<dyn CompletionGate>,
    indicator: Option<Arc<dyn LoadingIndicator>>,
    simulation_gate: Option<Arc<dyn SimulationGate>>,
    events: EventBus<TransitionEvent>,
    options: OrchestratorOptions,
    running: AtomicBool,
    flight: Semaphore,
}

/// Builder for [`TransitionOrchestrator`]; every collaborator but the
/// loader and the event bus is optional.
pub struct TransitionOrchestratorBuilder {
    loader: Arc<dyn SceneLoader>,
    events: EventBus<TransitionEvent>,
    fade: Option<Arc<dyn FadeAdapter>>,
    completion_gate: Option<Arc<dyn CompletionGate>>,
    indicator: Option<Arc<dyn LoadingIndicator>>,
    simulation_gate: Option<Arc<dyn SimulationGate>>,
    options: OrchestratorOptions,
}

impl TransitionOrchestratorBuilder {
    #[must_use]
    pub fn fade(mut self, fade: Arc<dyn FadeAdapter>) -> Self {
        self.fade = Some(fade);
        self
    }

    /// Gate awaited before the reveal. Defaults to [`NoopCompletionGate`].
    #[must_use]
    pub fn completion_gate(mut self, gate: Arc<dyn CompletionGate>) -> Self {
        self.completion_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// Gate on which the orchestrator holds [`SCENE_TRANSITION_TOKEN`]
    /// from just before `Started` until just before `Completed`.
    #[must_use]
    pub fn simulation_gate(mut self, gate: Arc<dyn SimulationGate>) -> Self {
        self.simulation_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn build(self) -> TransitionOrchestrator {
        TransitionOrchestrator {
            loader: self.loader,
            fade: self.fade,
            completion_gate: self
                .completion_gate
                .unwrap_or_else(|| Arc::new(NoopCompletionGate)),
            indicator: self.indicator,
            simulation_gate: self.simulation_gate,
            events: self.events,
            options: self.options,
            running: AtomicBool::new(false),
            flight: Semaphore::new(1),
        }
    }
}

/// Holds both guard layers for one transition.
struct FlightGuard<'a> {
    running: &'a AtomicBool,
    permit: Option<SemaphorePermit<'a>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Permit first, so a caller that wins the flag next also wins the permit.
        self.permit.take();
        self.running.store(false, Ordering::Release);
    }
}

/// Hides the loading indicator exactly once, on whichever path leaves first.
struct IndicatorGuard<'a> {
    indicator: Option<&'a dyn LoadingIndicator>,
}

impl<'a> IndicatorGuard<'a> {
    fn show(indicator: Option<&'a dyn LoadingIndicator>, context: &TransitionContext) -> Self {
        if let Some(indicator) = indicator {
            indicator.show(context);
        }
        Self { indicator }
    }

    fn hide(&mut self) {
        if let Some(indicator) = self.indicator.take() {
            indicator.hide();
        }
    }
}

impl Drop for IndicatorGuard<'_> {
    fn drop(&mut self) {
        self.hide();
    }
}

/// Control flow out of a pipeline step.
enum Step {
    Continue,
    Cancelled,
}

impl TransitionOrchestrator {
    /// Starts building an orchestrator around `loader` that publishes on
    /// `events`.
    #[must_use]
    pub fn builder(
        loader: Arc<dyn SceneLoader>,
        events: EventBus<TransitionEvent>,
    ) -> TransitionOrchestratorBuilder {
        TransitionOrchestratorBuilder {
            loader,
            events,
            fade: None,
            completion_gate: None,
            indicator: None,
            simulation_gate: None,
            options: OrchestratorOptions::default(),
        }
    }

    /// True while a transition is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs a transition without a cancellation signal.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when the scene loader or the fade adapter
    /// fails. Remaining phases are skipped and the guard is released first.
    pub async fn run(&self, request: TransitionRequest) -> Result<TransitionOutcome, TransitionError> {
        self.execute(request, None).await
    }

    /// Runs a transition, stopping at the next phase boundary once `cancel`
    /// fires. Scene work already done is kept.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when the scene loader or the fade adapter
    /// fails, including their own cancellation or timeout errors.
    pub async fn run_with_cancellation(
        &self,
        request: TransitionRequest,
        cancel: &CancellationToken,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.execute(request, Some(cancel)).await
    }

    async fn execute(
        &self,
        request: TransitionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let Some(_guard) = self.try_enter() else {
            debug!("scene transition rejected: another transition is in flight");
            return Ok(TransitionOutcome::Rejected);
        };

        let span = info_span!("scene_transition", signature = tracing::field::Empty);
        let result = self.drive(request, cancel).instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            Ok(TransitionOutcome::Cancelled { last_published }) => {
                info!(?last_published, "scene transition cancelled");
            }
            Ok(_) => {}
            Err(err) if err.is_cancellation() => {
                info!(error = %err, "scene transition stopped by adapter cancellation");
            }
            Err(err) => {
                error!(error = %err, detail = ?err, "scene transition failed");
            }
        }
        result
    }

    fn try_enter(&self) -> Option<FlightGuard<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        if let Ok(permit) = self.flight.try_acquire() {
            Some(FlightGuard {
                running: &self.running,
                permit: Some(permit),
            })
        } else {
            self.running.store(false, Ordering::Release);
            None
        }
    }

    async fn drive(
        &self,
        request: TransitionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<TransitionOutcome, TransitionError> {
        let context = self.prepare(&request).await?;
        tracing::Span::current().record("signature", context.signature());

        if is_cancelled(cancel) {
            return Ok(TransitionOutcome::Cancelled {
                last_published: None,
            });
        }

        let mut hold: Option<GateHandle> = self
            .simulation_gate
            .as_ref()
            .map(|gate| gate.acquire(SCENE_TRANSITION_TOKEN));
        self.publish(TransitionPhase::Started, &context);

        let fade = self.usable_fade(&context);
        if let Some(fade) = fade {
            if let Some(profile) = context.fade_profile() {
                fade.configure_from_profile(profile)
                    .await
                    .map_err(fade_error(FadeOperation::Configure))?;
            }
            fade.conceal().await.map_err(fade_error(FadeOperation::Conceal))?;
        }

        let mut indicator = IndicatorGuard::show(self.indicator.as_deref(), &context);

        if let Step::Cancelled = self.apply_scenes(&context, cancel).await? {
            return Ok(TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::Started),
            });
        }
        if is_cancelled(cancel) {
            return Ok(TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::Started),
            });
        }
        self.publish(TransitionPhase::ScenesReady, &context);

        if let Step::Cancelled = self.await_gate(&context, cancel).await {
            return Ok(TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::ScenesReady),
            });
        }

        indicator.hide();
        if is_cancelled(cancel) {
            return Ok(TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::ScenesReady),
            });
        }
        self.publish(TransitionPhase::BeforeConceal, &context);

        if let Some(fade) = fade {
            fade.reveal().await.map_err(fade_error(FadeOperation::Reveal))?;
        }

        // The token must be free by the time `Completed` is observed.
        drop(hold.take());
        self.publish(TransitionPhase::Completed, &context);
        info!("scene transition completed");

        Ok(TransitionOutcome::Completed(context))
    }

    /// Canonicalises the request and resolves it against loader state.
    async fn prepare(&self, request: &TransitionRequest) -> Result<TransitionContext, TransitionError> {
        let normalized = TransitionContext::from_request(request)
            .with_default_profile(self.options.default_fade_profile.as_deref());

        let current_active = self
            .loader
            .active_scene_name()
            .await
            .map_err(loader_error(LoaderOperation::Query, ""))?;

        let mut loaded: Vec<&str> = Vec::new();
        for scene in normalized
            .scenes_to_load()
            .iter()
            .chain(normalized.scenes_to_unload())
        {
            if self.is_loaded(scene).await? {
                loaded.push(scene);
            }
        }

        let foreground = foreground_scene(&normalized, &current_active);
        Ok(resolve_plan(
            &normalized,
            |scene| loaded.contains(&scene),
            foreground,
        ))
    }

    async fn apply_scenes(
        &self,
        context: &TransitionContext,
        cancel: Option<&CancellationToken>,
    ) -> Result<Step, TransitionError> {
        for scene in context.scenes_to_load() {
            if self.is_loaded(scene).await? {
                debug!(scene = %scene, "scene already loaded; skipping");
            } else {
                self.loader
                    .load_scene(scene)
                    .await
                    .map_err(loader_error(LoaderOperation::Load, scene))?;
                debug!(scene = %scene, "scene loaded");
            }
            if is_cancelled(cancel) {
                return Ok(Step::Cancelled);
            }
        }

        let foreground = if context.has_target() {
            let target = context.target_active_scene();
            let switched = self
                .loader
                .try_set_active_scene(target)
                .await
                .map_err(loader_error(LoaderOperation::SetActive, target))?;
            if switched {
                debug!(scene = %target, "foreground scene set");
                target.to_owned()
            } else {
                warn!(scene = %target, "loader could not make scene active; continuing");
                // The previous foreground scene is still showing.
                self.loader
                    .active_scene_name()
                    .await
                    .map_err(loader_error(LoaderOperation::Query, ""))?
            }
        } else {
            self.loader
                .active_scene_name()
                .await
                .map_err(loader_error(LoaderOperation::Query, ""))?
        };

        for scene in context.scenes_to_unload() {
            if *scene == foreground {
                info!(scene = %scene, "refusing to unload the foreground scene");
                continue;
            }
            if !self.is_loaded(scene).await? {
                debug!(scene = %scene, "scene not loaded; nothing to unload");
                continue;
            }
            self.loader
                .unload_scene(scene)
                .await
                .map_err(loader_error(LoaderOperation::Unload, scene))?;
            debug!(scene = %scene, "scene unloaded");
            if is_cancelled(cancel) {
                return Ok(Step::Cancelled);
            }
        }

        Ok(Step::Continue)
    }

    /// Awaits the completion gate. Gate failures never leave this function.
    async fn await_gate(&self, context: &TransitionContext, cancel: Option<&CancellationToken>) -> Step {
        if is_cancelled(cancel) {
            return Step::Cancelled;
        }

        let gate = self.completion_gate.await_before_reveal(context);
        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Step::Cancelled,
                    result = gate => result,
                }
            }
            None => gate.await,
        };

        if let Err(err) = result {
            warn!(error = %err, "completion gate failed; continuing with reveal");
        }
        if is_cancelled(cancel) {
            return Step::Cancelled;
        }
        Step::Continue
    }

    async fn is_loaded(&self, scene: &str) -> Result<bool, TransitionError> {
        self.loader
            .is_scene_loaded(scene)
            .await
            .map_err(loader_error(LoaderOperation::Query, scene))
    }

    fn usable_fade(&self, context: &TransitionContext) -> Option<&dyn FadeAdapter> {
        if !context.use_fade() {
            return None;
        }
        match self.fade.as_deref() {
            Some(fade) if fade.is_available() => Some(fade),
            _ => {
                debug!("fade requested but no fade surface is available");
                None
            }
        }
    }

    fn publish(&self, phase: TransitionPhase, context: &TransitionContext) {
        let delivered = self
            .events
            .publish(&TransitionEvent::new(phase, context.clone()));
        debug!(?phase, delivered, "transition phase published");
    }
}

impl std::fmt::Debug for TransitionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionOrchestrator")
            .field("running", &self.is_running())
            .field("has_fade", &self.fade.is_some())
            .field("has_indicator", &self.indicator.is_some())
            .field("has_simulation_gate", &self.simulation_gate.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(CancellationToken::is_cancelled)
}

fn loader_error(
    operation: LoaderOperation,
    scene: &str,
) -> impl FnOnce(AdapterError) -> TransitionError + '_ {
    move |source| TransitionError::Loader {
        operation,
        scene: scene.to_owned(),
        source,
    }
}

fn fade_error(operation: FadeOperation) -> impl FnOnce(AdapterError) -> TransitionError {
    move |source| TransitionError::Fade { operation, source }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio_util::sync::CancellationToken;
    use waypoint_core::bus::EventBus;
    use waypoint_core::error::{AdapterError, FadeOperation, LoaderOperation, TransitionError};
    use waypoint_core::event::{TransitionEvent, TransitionPhase};
    use waypoint_core::request::TransitionRequest;
    use waypoint_core::simulation::{RefCountedGate, SCENE_TRANSITION_TOKEN, SimulationGate};
    use waypoint_test_support::{
        EventRecorder, FadeCall, FailingCompletionGate, LoaderCall, PendingCompletionGate,
        RecordingCompletionGate, RecordingFade, RecordingIndicator, RecordingSceneLoader,
    };

    use super::{OrchestratorOptions, TransitionOrchestrator};
    use crate::domain::outcome::TransitionOutcome;

    const FULL_CYCLE: [TransitionPhase; 4] = [
        TransitionPhase::Started,
        TransitionPhase::ScenesReady,
        TransitionPhase::BeforeConceal,
        TransitionPhase::Completed,
    ];

    fn harbor_request() -> TransitionRequest {
        TransitionRequest::new(["A", "B"], ["C"], "A", true)
    }

    #[tokio::test]
    async fn test_run_skips_present_scenes_and_publishes_every_phase() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["A", "Title"], "Title"));
        let fade = Arc::new(RecordingFade::new());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone())
            .fade(fade.clone())
            .build();

        // Act
        let outcome = orchestrator.run(harbor_request()).await.unwrap();

        // Assert
        assert_eq!(
            loader.calls(),
            vec![
                LoaderCall::Load("B".to_owned()),
                LoaderCall::SetActive("A".to_owned()),
            ]
        );
        assert_eq!(recorder.phases(), FULL_CYCLE);
        for event in recorder.events() {
            assert_eq!(event.context().scenes_to_load(), ["B"]);
            assert!(event.context().scenes_to_unload().is_empty());
        }
        let context = outcome.context().unwrap();
        assert_eq!(context.target_active_scene(), "A");
        assert_eq!(fade.calls(), vec![FadeCall::Conceal, FadeCall::Reveal]);
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_concurrent_runs_only_one_publishes() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();

        // Act
        let (first, second) = tokio::join!(
            orchestrator.run(harbor_request()),
            orchestrator.run(harbor_request())
        );

        // Assert
        let outcomes = [first.unwrap(), second.unwrap()];
        assert_eq!(outcomes.iter().filter(|o| o.is_completed()).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.is_rejected()).count(), 1);
        assert_eq!(recorder.phases(), FULL_CYCLE);
        assert_eq!(
            loader.calls(),
            vec![
                LoaderCall::Load("A".to_owned()),
                LoaderCall::Load("B".to_owned()),
                LoaderCall::SetActive("A".to_owned()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_callers_never_interleave_phases() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = Arc::new(TransitionOrchestrator::builder(loader, bus.clone()).build());

        // Act
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    let scene = format!("Level{}", i % 2);
                    orchestrator
                        .run(TransitionRequest::new([scene.as_str()], ["Title"], scene.as_str(), false))
                        .await
                })
            })
            .collect();
        let mut completed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_completed() {
                completed += 1;
            }
        }

        // Assert
        let phases = recorder.phases();
        assert!(completed >= 1);
        assert_eq!(phases.len(), completed * 4);
        for cycle in phases.chunks(4) {
            assert_eq!(cycle, FULL_CYCLE);
        }
    }

    #[tokio::test]
    async fn test_failing_completion_gate_still_completes() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .completion_gate(Arc::new(FailingCompletionGate))
            .build();

        // Act
        let outcome = orchestrator.run(harbor_request()).await;

        // Assert
        assert!(outcome.unwrap().is_completed());
        assert_eq!(recorder.phases(), FULL_CYCLE);
    }

    #[tokio::test]
    async fn test_completion_gate_sees_resolved_signature_once() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let gate = Arc::new(RecordingCompletionGate::new());
        let loader = Arc::new(RecordingSceneLoader::new(["A"], "A"));
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .completion_gate(gate.clone())
            .build();

        orchestrator.run(harbor_request()).await.unwrap();

        let started = &recorder.events()[0];
        assert_eq!(gate.signatures(), vec![started.signature().to_owned()]);
    }

    #[tokio::test]
    async fn test_loader_failure_propagates_and_releases_guard() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title").failing_load("B"));
        let indicator = Arc::new(RecordingIndicator::new());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone())
            .loading_indicator(indicator.clone())
            .build();

        // Act
        let result = orchestrator.run(harbor_request()).await;

        // Assert
        match result.unwrap_err() {
            TransitionError::Loader {
                operation, scene, ..
            } => {
                assert_eq!(operation, LoaderOperation::Load);
                assert_eq!(scene, "B");
            }
            other => panic!("expected Loader, got {other:?}"),
        }
        assert_eq!(recorder.phases(), [TransitionPhase::Started]);
        assert!(!orchestrator.is_running());
        assert_eq!(indicator.shown(), 1);
        assert_eq!(indicator.hidden(), 1);

        let retry = orchestrator
            .run(TransitionRequest::new(["A"], Vec::<&str>::new(), "A", false))
            .await;
        assert!(retry.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_unload_failure_never_publishes_scenes_ready() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title", "C"], "Title").failing_unload("C"));
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone()).build();

        let result = orchestrator.run(harbor_request()).await;

        assert!(result.is_err());
        assert_eq!(recorder.phases(), [TransitionPhase::Started]);
    }

    #[tokio::test]
    async fn test_target_scene_is_never_unloaded() {
        // Arrange
        let bus = EventBus::new("transitions");
        let loader = Arc::new(RecordingSceneLoader::new(["A", "B", "Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();

        // Act
        orchestrator
            .run(TransitionRequest::new(Vec::<&str>::new(), ["A", "B"], "A", false))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            loader.calls(),
            vec![
                LoaderCall::SetActive("A".to_owned()),
                LoaderCall::Unload("B".to_owned()),
            ]
        );
        assert_eq!(loader.active_scene(), "A");
    }

    #[tokio::test]
    async fn test_refused_activation_is_not_a_failure() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title").refusing_activation());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();

        let outcome = orchestrator.run(harbor_request()).await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(recorder.phases(), FULL_CYCLE);
        assert_eq!(loader.active_scene(), "Title");
    }

    #[tokio::test]
    async fn test_refused_activation_keeps_current_scene_loaded() {
        // Arrange
        let bus = EventBus::new("transitions");
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title").refusing_activation());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus).build();
        let request = TransitionRequest::new(["A"], ["Title"], "A", false);

        // Act
        let outcome = orchestrator.run(request).await.unwrap();

        // Assert
        assert!(outcome.is_completed());
        assert_eq!(
            loader.calls(),
            [
                LoaderCall::Load("A".to_owned()),
                LoaderCall::SetActive("A".to_owned()),
            ]
        );
        assert_eq!(loader.active_scene(), "Title");
        assert_eq!(loader.loaded_scenes(), ["Title", "A"]);
    }

    #[tokio::test]
    async fn test_fade_profile_is_applied_before_conceal() {
        // Arrange
        let bus = EventBus::new("transitions");
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let fade = Arc::new(RecordingFade::new());
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .fade(fade.clone())
            .options(OrchestratorOptions {
                default_fade_profile: Some("Soft".to_owned()),
            })
            .build();

        // Act
        let named = orchestrator
            .run(harbor_request().with_profile("Hard"))
            .await
            .unwrap();
        let defaulted = orchestrator.run(harbor_request()).await.unwrap();

        // Assert
        assert_eq!(named.context().unwrap().fade_profile(), Some("Hard"));
        assert_eq!(defaulted.context().unwrap().fade_profile(), Some("Soft"));
        assert_eq!(
            fade.calls(),
            vec![
                FadeCall::Configure("Hard".to_owned()),
                FadeCall::Conceal,
                FadeCall::Reveal,
                FadeCall::Configure("Soft".to_owned()),
                FadeCall::Conceal,
                FadeCall::Reveal,
            ]
        );
    }

    #[tokio::test]
    async fn test_unavailable_fade_is_skipped() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let fade = Arc::new(RecordingFade::unavailable());
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .fade(fade.clone())
            .build();

        orchestrator.run(harbor_request()).await.unwrap();

        assert!(fade.calls().is_empty());
        assert_eq!(recorder.phases(), FULL_CYCLE);
    }

    #[tokio::test]
    async fn test_reveal_failure_stops_before_completed() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let fade = Arc::new(
            RecordingFade::new().failing(FadeCall::Reveal, AdapterError::Failed("gpu lost".into())),
        );
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .fade(fade)
            .build();

        let err = orchestrator.run(harbor_request()).await.unwrap_err();

        match err {
            TransitionError::Fade { operation, .. } => assert_eq!(operation, FadeOperation::Reveal),
            other => panic!("expected Fade, got {other:?}"),
        }
        assert_eq!(
            recorder.phases(),
            [
                TransitionPhase::Started,
                TransitionPhase::ScenesReady,
                TransitionPhase::BeforeConceal,
            ]
        );
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_adapter_timeout_is_surfaced_not_swallowed() {
        let bus = EventBus::new("transitions");
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let fade = Arc::new(
            RecordingFade::new().failing(FadeCall::Conceal, AdapterError::TimedOut("500ms".into())),
        );
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone())
            .fade(fade)
            .build();

        let err = orchestrator.run(harbor_request()).await.unwrap_err();

        assert!(err.is_cancellation());
        assert!(loader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_start_publishes_nothing() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();
        let token = CancellationToken::new();
        token.cancel();

        // Act
        let outcome = orchestrator
            .run_with_cancellation(harbor_request(), &token)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            outcome,
            TransitionOutcome::Cancelled {
                last_published: None
            }
        );
        assert!(recorder.phases().is_empty());
        assert!(loader.calls().is_empty());
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_on_gate_keeps_scene_work() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let gate = Arc::new(PendingCompletionGate::new());
        let indicator = Arc::new(RecordingIndicator::new());
        let simulation = Arc::new(RefCountedGate::new());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone())
            .completion_gate(gate.clone())
            .loading_indicator(indicator.clone())
            .simulation_gate(simulation.clone())
            .build();
        let token = CancellationToken::new();
        let entered = gate.entered();

        // Act
        let (outcome, ()) = tokio::join!(
            orchestrator.run_with_cancellation(harbor_request(), &token),
            async {
                entered.notified().await;
                token.cancel();
            }
        );

        // Assert
        assert_eq!(
            outcome.unwrap(),
            TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::ScenesReady)
            }
        );
        assert_eq!(
            recorder.phases(),
            [TransitionPhase::Started, TransitionPhase::ScenesReady]
        );
        assert_eq!(loader.loaded_scenes(), ["Title", "A", "B"]);
        assert_eq!(indicator.hidden(), 1);
        assert!(!simulation.is_token_active(SCENE_TRANSITION_TOKEN));
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_cancel_after_scene_load_stops_before_scenes_ready() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let token = CancellationToken::new();
        let trigger = token.clone();
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title").after_call(
            move |call| {
                if *call == LoaderCall::Load("A".to_owned()) {
                    trigger.cancel();
                }
            },
        ));
        let indicator = Arc::new(RecordingIndicator::new());
        let simulation = Arc::new(RefCountedGate::new());
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone())
            .loading_indicator(indicator.clone())
            .simulation_gate(simulation.clone())
            .build();
        let request = TransitionRequest::new(["A", "B"], ["Title"], "A", false);

        // Act
        let outcome = orchestrator
            .run_with_cancellation(request.clone(), &token)
            .await;

        // Assert
        assert_eq!(
            outcome.unwrap(),
            TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::Started)
            }
        );
        assert_eq!(recorder.phases(), [TransitionPhase::Started]);
        assert_eq!(loader.calls(), [LoaderCall::Load("A".to_owned())]);
        assert_eq!(indicator.hidden(), 1);
        assert!(!simulation.is_token_active(SCENE_TRANSITION_TOKEN));
        assert!(!orchestrator.is_running());

        let retry = orchestrator.run(request).await;
        assert!(retry.unwrap().is_completed());
        assert_eq!(loader.loaded_scenes(), ["A", "B"]);
    }

    #[tokio::test]
    async fn test_cancel_after_scene_unload_stops_before_scenes_ready() {
        // Arrange
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let token = CancellationToken::new();
        let trigger = token.clone();
        let loader = Arc::new(RecordingSceneLoader::new(["Title", "Menu"], "Title").after_call(
            move |call| {
                if matches!(call, LoaderCall::Unload(_)) {
                    trigger.cancel();
                }
            },
        ));
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();
        let request = TransitionRequest::new(["A"], ["Title", "Menu"], "A", false);

        // Act
        let outcome = orchestrator.run_with_cancellation(request, &token).await;

        // Assert
        assert_eq!(
            outcome.unwrap(),
            TransitionOutcome::Cancelled {
                last_published: Some(TransitionPhase::Started)
            }
        );
        assert_eq!(recorder.phases(), [TransitionPhase::Started]);
        assert_eq!(
            loader.calls(),
            [
                LoaderCall::Load("A".to_owned()),
                LoaderCall::SetActive("A".to_owned()),
                LoaderCall::Unload("Title".to_owned()),
            ]
        );
        assert_eq!(loader.loaded_scenes(), ["Menu", "A"]);
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_scene_transition_token_held_from_started_until_completed() {
        // Arrange
        let bus = EventBus::new("transitions");
        let simulation = Arc::new(RefCountedGate::new());
        let observed = Arc::new(Mutex::new(Vec::new()));
        let _probe = {
            let simulation = Arc::clone(&simulation);
            let observed = Arc::clone(&observed);
            bus.subscribe(move |event: &TransitionEvent| {
                observed.lock().unwrap().push((
                    event.phase(),
                    simulation.is_token_active(SCENE_TRANSITION_TOKEN),
                ));
            })
            .unwrap()
        };
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader, bus.clone())
            .simulation_gate(simulation.clone())
            .build();

        // Act
        orchestrator.run(harbor_request()).await.unwrap();

        // Assert
        assert_eq!(
            *observed.lock().unwrap(),
            vec![
                (TransitionPhase::Started, true),
                (TransitionPhase::ScenesReady, true),
                (TransitionPhase::BeforeConceal, true),
                (TransitionPhase::Completed, false),
            ]
        );
        assert_eq!(simulation.active_token_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_names_are_ignored() {
        let bus = EventBus::new("transitions");
        let recorder = EventRecorder::attach(&bus);
        let loader = Arc::new(RecordingSceneLoader::new(["Title"], "Title"));
        let orchestrator = TransitionOrchestrator::builder(loader.clone(), bus.clone()).build();

        orchestrator
            .run(TransitionRequest::new(["  ", "", " Cave "], ["   "], "", false))
            .await
            .unwrap();

        assert_eq!(loader.calls(), vec![LoaderCall::Load("Cave".to_owned())]);
        assert_eq!(recorder.events()[0].context().scenes_to_load(), ["Cave"]);
    }
}
