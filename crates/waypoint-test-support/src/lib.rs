//! Shared test doubles and utilities for the Waypoint engine.

mod clock;
mod fade;
mod gate;
mod indicator;
mod loader;
mod recorder;

pub use clock::FixedClock;
pub use fade::{FadeCall, RecordingFade};
pub use gate::{FailingCompletionGate, PendingCompletionGate, RecordingCompletionGate};
pub use indicator::RecordingIndicator;
pub use loader::{LoaderCall, RecordingSceneLoader};
pub use recorder::EventRecorder;
