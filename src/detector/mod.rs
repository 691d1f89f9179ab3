//! Gesture detectors.
//!
//! Each detector is a small state machine: a `Copy` state struct plus a pure
//! `process_sample(config, state, sample) -> (state, Option<GestureEvent>)`
//! function. The detector structs wrap that function so they can be driven
//! from a sample subscription through the [`GestureDetector`] trait.

mod shake;
mod step;
mod tilt;


pub use shake::{shake_speed, ShakeDetector, ShakeState};
pub use step::{StepDetector, StepState, StepTuning};
pub use tilt::{TiltDetector, TiltState};

use crate::events::{DetectorKind, GestureEvent};
use crate::sample::MotionSample;
use serde::{Deserialize, Serialize};

/// Per-detector tunables owned by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub cooldown_ms: u64,
}

impl DetectorConfig {
    pub fn new(enabled: bool, threshold: f64, cooldown_ms: u64) -> Self {
        Self {
            enabled,
            threshold,
            cooldown_ms,
        }
    }
}

/// A detector that turns samples into gestures
pub trait GestureDetector: Send {
    fn kind(&self) -> DetectorKind;

    /// Feed one sample; returns the gesture it completed, if any
    fn process(&mut self, config: &DetectorConfig, sample: &MotionSample) -> Option<GestureEvent>;
}

/// Whether enough time has passed since the last emission.
///
/// A timestamp older than the last emission never passes, which keeps the
/// last-event timestamp monotonic.
pub(crate) fn cooldown_elapsed(
    last_event: Option<u64>,
    now: u64,
    cooldown_ms: u64,
    inclusive: bool,
) -> bool {
    match last_event {
        None => true,
        Some(last) if now < last => false,
        Some(last) => {
            let elapsed = now - last;
            if inclusive {
                elapsed >= cooldown_ms
            } else {
                elapsed > cooldown_ms
            }
        }
    }
}
