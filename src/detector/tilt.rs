use super::{cooldown_elapsed, DetectorConfig, GestureDetector};
use crate::events::{DetectorKind, GestureEvent};
use crate::sample::MotionSample;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TiltState {
    pub last_event: Option<u64>,
}

/// Detects large front-back or left-right deflection.
///
/// There is no hysteresis: a device resting near the threshold angle keeps
/// re-triggering, bounded only by the rate limit.
#[derive(Debug, Default)]
pub struct TiltDetector {
    state: TiltState,
}

impl TiltDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TiltState {
        &self.state
    }

    pub fn process_sample(
        config: &DetectorConfig,
        state: TiltState,
        sample: &MotionSample,
    ) -> (TiltState, Option<GestureEvent>) {
        if !sample.has_orientation() {
            return (state, None);
        }

        if !config.enabled {
            return (state, None);
        }

        let beta = sample.beta.unwrap_or(0.0);
        let gamma = sample.gamma.unwrap_or(0.0);
        if beta.abs() <= config.threshold && gamma.abs() <= config.threshold {
            return (state, None);
        }

        if !cooldown_elapsed(state.last_event, sample.timestamp, config.cooldown_ms, true) {
            debug!("Tilt suppressed by rate limit (beta {:.1}, gamma {:.1})", beta, gamma);
            return (state, None);
        }

        info!("Tilt detected: beta {:.1}, gamma {:.1}", beta, gamma);
        let next = TiltState {
            last_event: Some(sample.timestamp),
        };
        (next, Some(GestureEvent::Tilt))
    }
}

impl GestureDetector for TiltDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Tilt
    }

    fn process(&mut self, config: &DetectorConfig, sample: &MotionSample) -> Option<GestureEvent> {
        let (next, event) = Self::process_sample(config, self.state, sample);
        self.state = next;
        event
    }
}
