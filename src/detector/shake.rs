use super::{cooldown_elapsed, DetectorConfig, GestureDetector};
use crate::events::{DetectorKind, GestureEvent};
use crate::sample::{Axes, MotionSample};
use tracing::{debug, info};

/// Rolling state of the shake detector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShakeState {
    /// Axes of the previous sample; zero before the first one
    pub previous: Axes,
    pub previous_timestamp: u64,
    pub last_event: Option<u64>,
    /// Over-threshold readings in the current burst
    pub shake_streak: u32,
}

/// Summed-axis jerk proxy: `|Σa − Σa_prev| / Δt_ms × 10000`
pub fn shake_speed(previous: &Axes, current: &Axes, elapsed_ms: u64) -> f64 {
    (current.sum() - previous.sum()).abs() / elapsed_ms as f64 * 10000.0
}

/// Detects violent device movement from acceleration-with-gravity
#[derive(Debug, Default)]
pub struct ShakeDetector {
    state: ShakeState,
}

impl ShakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ShakeState {
        &self.state
    }

    /// Advance the shake state machine by one sample.
    ///
    /// The first sample is compared against zero axes at time zero. With a
    /// realistic clock that yields a negligible speed; a stream starting near
    /// time zero can produce one cold-start trigger.
    pub fn process_sample(
        config: &DetectorConfig,
        state: ShakeState,
        sample: &MotionSample,
    ) -> (ShakeState, Option<GestureEvent>) {
        // Orientation-only ticks say nothing about movement
        let Some(current) = sample.accel() else {
            return (state, None);
        };
        let elapsed = sample.timestamp.saturating_sub(state.previous_timestamp);

        let mut next = ShakeState {
            previous: current,
            previous_timestamp: sample.timestamp,
            ..state
        };

        if !config.enabled || elapsed == 0 {
            return (next, None);
        }

        let speed = shake_speed(&state.previous, &current, elapsed);
        if speed <= config.threshold {
            next.shake_streak = 0;
            return (next, None);
        }

        next.shake_streak = state.shake_streak.saturating_add(1);

        if !cooldown_elapsed(state.last_event, sample.timestamp, config.cooldown_ms, false) {
            debug!(
                "Shake suppressed by cooldown (speed {:.1}, streak {})",
                speed, next.shake_streak
            );
            return (next, None);
        }

        info!(
            "Shake detected: speed {:.1} > threshold {:.1}",
            speed, config.threshold
        );
        next.last_event = Some(sample.timestamp);
        (next, Some(GestureEvent::Shake))
    }
}

impl GestureDetector for ShakeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Shake
    }

    fn process(&mut self, config: &DetectorConfig, sample: &MotionSample) -> Option<GestureEvent> {
        let (next, event) = Self::process_sample(config, self.state, sample);
        self.state = next;
        event
    }
}
