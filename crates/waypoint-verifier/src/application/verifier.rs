//! The invariant verifier.
//!
//! State is keyed by transition signature and only ever grows, unless
//! `max_tracked_signatures` is set, in which case the oldest signature is
//! evicted first. All state sits behind one mutex, so events may be
//! delivered from any thread.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};
use waypoint_core::clock::{Clock, SystemClock};
use waypoint_core::event::{HubEvent, PauseEvent, ResetCompleted, RunLifecycleEvent, TransitionEvent};
use waypoint_core::simulation::{PAUSE_TOKEN, SCENE_TRANSITION_TOKEN, SimulationGate};

use crate::domain::state::{RunCounters, SignatureState};
use crate::domain::violation::{GLOBAL_SIGNATURE, InvariantCode, InvariantFamily, Violation};

/// Default state identifier a run start must carry.
pub const DEFAULT_RUN_STATE: &str = "running";

/// Verifier tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Panic on every violation. For test and QA builds only.
    pub strict: bool,
    /// Require a reset-completed event before `BeforeConceal`/`Completed`.
    pub expect_reset: bool,
    /// State identifier run-start events must carry.
    pub expected_run_state: String,
    /// Evict the oldest signature beyond this many. `None` keeps everything.
    pub max_tracked_signatures: Option<usize>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            strict: false,
            expect_reset: true,
            expected_run_state: DEFAULT_RUN_STATE.to_owned(),
            max_tracked_signatures: None,
        }
    }
}

#[derive(Debug, Default)]
struct Tracker {
    next_stamp: u64,
    signatures: HashMap<String, SignatureState>,
    insertion_order: VecDeque<String>,
    run: RunCounters,
    violations: Vec<Violation>,
}

impl Tracker {
    fn stamp(&mut self) -> u64 {
        self.next_stamp += 1;
        self.next_stamp
    }

    fn entry(&mut self, signature: &str, limit: Option<usize>) -> &mut SignatureState {
        if !self.signatures.contains_key(signature) {
            if let Some(limit) = limit {
                while self.signatures.len() >= limit.max(1) {
                    let Some(oldest) = self.insertion_order.pop_front() else {
                        break;
                    };
                    self.signatures.remove(&oldest);
                    debug!(signature = %oldest, "evicted verifier state");
                }
            }
            self.insertion_order.push_back(signature.to_owned());
        }
        self.signatures.entry(signature.to_owned()).or_default()
    }
}

/// Pending violation, before it is stamped with a time.
struct Finding {
    signature: String,
    code: InvariantCode,
    message: String,
}

impl Finding {
    fn new(signature: &str, code: InvariantCode, message: impl Into<String>) -> Self {
        Self {
            signature: signature.to_owned(),
            code,
            message: message.into(),
        }
    }
}

/// Observes hub events and reports broken invariants.
pub struct InvariantVerifier {
    config: VerifierConfig,
    simulation_gate: Option<Arc<dyn SimulationGate>>,
    clock: Arc<dyn Clock>,
    tracker: Mutex<Tracker>,
}

impl InvariantVerifier {
    /// Creates a verifier with the system clock and no simulation gate.
    /// Gate-token and pause-token checks are skipped until a gate is supplied.
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            simulation_gate: None,
            clock: Arc::new(SystemClock),
            tracker: Mutex::new(Tracker::default()),
        }
    }

    #[must_use]
    pub fn with_simulation_gate(mut self, gate: Arc<dyn SimulationGate>) -> Self {
        self.simulation_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Checks a phase event and returns the violations it exposed.
    ///
    /// # Panics
    ///
    /// Panics in strict mode when a violation is found.
    pub fn observe_transition(&self, event: &TransitionEvent) -> Vec<Violation> {
        let signature = event.signature();
        let gate = self.simulation_gate.as_deref();
        let limit = self.config.max_tracked_signatures;
        let mut findings = Vec::new();

        let mut tracker = self.lock();
        let stamp = tracker.stamp();
        let state = tracker.entry(signature, limit);

        match event {
            TransitionEvent::Started(_) => {
                if let Some(gate) = gate
                    && !gate.is_token_active(SCENE_TRANSITION_TOKEN)
                {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::TokenNotHeldOnStarted,
                        "transition started without the scene-transition token held",
                    ));
                }
                if state.is_in_flight() {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::OverlappingStart,
                        "transition started again before the previous one completed; state reset",
                    ));
                }
                // A completed signature keeps its state, so a repeat of the
                // same transition shows up as a duplicate reset. Otherwise a
                // fresh cycle opens, still remembering any earlier reset.
                if !state.is_completed() {
                    *state = SignatureState {
                        started: Some(stamp),
                        reset_completed: state.reset_completed,
                        reset_reason: state.reset_reason.take(),
                        ..SignatureState::default()
                    };
                }
            }
            TransitionEvent::ScenesReady(_) => {
                if !state.is_started() {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::ScenesReadyBeforeStarted,
                        "scenes ready observed before the transition started",
                    ));
                }
                state.scenes_ready.get_or_insert(stamp);
            }
            TransitionEvent::BeforeConceal(_) => {
                if self.config.expect_reset && !state.is_reset_completed() {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::BeforeConcealWithoutReset,
                        "pre-reveal hold reached before the world reset completed",
                    ));
                }
                state.before_conceal.get_or_insert(stamp);
            }
            TransitionEvent::Completed(_) => {
                if let Some(gate) = gate
                    && gate.is_token_active(SCENE_TRANSITION_TOKEN)
                {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::TokenHeldOnCompleted,
                        "transition completed while the scene-transition token is still held",
                    ));
                }
                if !state.is_scenes_ready() {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::CompletedBeforeScenesReady,
                        "transition completed before scenes were ready",
                    ));
                }
                if self.config.expect_reset && !state.is_reset_completed() {
                    findings.push(Finding::new(
                        signature,
                        InvariantCode::CompletedWithoutReset,
                        "transition completed before the world reset completed",
                    ));
                }
                state.completed.get_or_insert(stamp);
            }
        }

        self.record(tracker, findings, event)
    }

    /// Checks a world-reset completion.
    ///
    /// # Panics
    ///
    /// Panics in strict mode when a violation is found.
    pub fn observe_reset(&self, event: &ResetCompleted) -> Vec<Violation> {
        let signature = event.correlation_key();
        let limit = self.config.max_tracked_signatures;
        let mut findings = Vec::new();

        let mut tracker = self.lock();
        let stamp = tracker.stamp();
        let state = tracker.entry(signature, limit);

        if state.is_reset_completed() {
            findings.push(Finding::new(
                signature,
                InvariantCode::DuplicateReset,
                "world reset completed more than once for this transition",
            ));
        } else {
            if !state.is_started() {
                findings.push(Finding::new(
                    signature,
                    InvariantCode::ResetBeforeScenesReady,
                    "world reset completed for a transition that never started",
                ));
            } else if !state.is_scenes_ready() {
                findings.push(Finding::new(
                    signature,
                    InvariantCode::ResetBeforeScenesReady,
                    "world reset completed before scenes were ready",
                ));
            }
            if state.is_before_conceal() {
                findings.push(Finding::new(
                    signature,
                    InvariantCode::ResetAfterBeforeConceal,
                    "world reset completed after the pre-reveal hold",
                ));
            }
            state.reset_completed = Some(stamp);
            state.reset_reason = Some(event.reason.clone());
        }

        self.record(tracker, findings, event)
    }

    /// Checks a run start or end.
    ///
    /// # Panics
    ///
    /// Panics in strict mode when a violation is found.
    pub fn observe_run(&self, event: &RunLifecycleEvent) -> Vec<Violation> {
        let mut findings = Vec::new();
        let mut tracker = self.lock();
        let stamp = tracker.stamp();

        match event {
            RunLifecycleEvent::Started { run_id, state_id } => {
                if tracker.run.active {
                    findings.push(Finding::new(
                        GLOBAL_SIGNATURE,
                        InvariantCode::RunStartWhileActive,
                        "run started while the previous run is still active",
                    ));
                }
                if *state_id != self.config.expected_run_state {
                    findings.push(Finding::new(
                        GLOBAL_SIGNATURE,
                        InvariantCode::UnexpectedRunState,
                        format!(
                            "run started in state '{state_id}', expected '{}'",
                            self.config.expected_run_state
                        ),
                    ));
                }
                tracker.run = RunCounters::started(*run_id, stamp);
            }
            RunLifecycleEvent::Ended { .. } => {
                if !tracker.run.active {
                    if tracker.run.end_count > 0 {
                        findings.push(Finding::new(
                            GLOBAL_SIGNATURE,
                            InvariantCode::DuplicateRunEnd,
                            format!(
                                "run ended {} times",
                                tracker.run.end_count.saturating_add(1)
                            ),
                        ));
                    } else {
                        findings.push(Finding::new(
                            GLOBAL_SIGNATURE,
                            InvariantCode::RunEndWithoutRun,
                            "run ended with no active run",
                        ));
                    }
                }
                tracker.run.active = false;
                tracker.run.end_count = tracker.run.end_count.saturating_add(1);
                tracker.run.ended.get_or_insert(stamp);
            }
        }

        self.record(tracker, findings, event)
    }

    /// Checks pause/resume against the pause token.
    ///
    /// # Panics
    ///
    /// Panics in strict mode when a violation is found.
    pub fn observe_pause(&self, event: &PauseEvent) -> Vec<Violation> {
        let mut findings = Vec::new();
        let tracker = self.lock();

        if let Some(gate) = self.simulation_gate.as_deref() {
            let held = gate.is_token_active(PAUSE_TOKEN);
            if event.is_release() && held {
                findings.push(Finding::new(
                    GLOBAL_SIGNATURE,
                    InvariantCode::PauseTokenHeldAfterResume,
                    "pause released but the pause token is still held",
                ));
            } else if !event.is_release() && !held {
                // Subscriber order is not guaranteed; the gate owner may not
                // have acquired the token yet.
                warn!("pause requested before the pause token was acquired");
            }
        }

        self.record(tracker, findings, event)
    }

    /// All violations reported so far.
    pub fn violations(&self) -> Vec<Violation> {
        self.lock().violations.clone()
    }

    /// Drains the reported violations.
    pub fn take_violations(&self) -> Vec<Violation> {
        std::mem::take(&mut self.lock().violations)
    }

    pub fn violation_count(&self) -> usize {
        self.lock().violations.len()
    }

    /// Violations per invariant family.
    pub fn violation_counts(&self) -> BTreeMap<InvariantFamily, usize> {
        let mut counts = BTreeMap::new();
        for violation in &self.lock().violations {
            *counts.entry(violation.code.family()).or_insert(0) += 1;
        }
        counts
    }

    pub fn tracked_signatures(&self) -> usize {
        self.lock().signatures.len()
    }

    /// Snapshot of the state tracked for `signature`.
    pub fn state_of(&self, signature: &str) -> Option<SignatureState> {
        self.lock().signatures.get(signature).cloned()
    }

    pub fn run_counters(&self) -> RunCounters {
        self.lock().run.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores findings, then logs (and in strict mode panics) with the lock
    /// released.
    fn record(
        &self,
        mut tracker: MutexGuard<'_, Tracker>,
        findings: Vec<Finding>,
        event: &dyn HubEvent,
    ) -> Vec<Violation> {
        if findings.is_empty() {
            return Vec::new();
        }

        let detail = format!("{} {}", event.event_type(), event.to_payload());
        let observed_at = self.clock.now();
        let violations: Vec<Violation> = findings
            .into_iter()
            .map(|finding| Violation {
                signature: finding.signature,
                code: finding.code,
                message: finding.message,
                detail: detail.clone(),
                observed_at,
            })
            .collect();
        tracker.violations.extend(violations.iter().cloned());
        drop(tracker);

        for violation in &violations {
            error!(
                code = %violation.code,
                signature = %violation.signature,
                message = %violation.message,
                detail = %violation.detail,
                "invariant violation"
            );
        }
        if self.config.strict {
            let summary: Vec<String> = violations.iter().map(ToString::to_string).collect();
            panic!("invariant violation: {}", summary.join("; "));
        }
        violations
    }
}

impl std::fmt::Debug for InvariantVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvariantVerifier")
            .field("config", &self.config)
            .field("has_simulation_gate", &self.simulation_gate.is_some())
            .finish_non_exhaustive()
    }
}
