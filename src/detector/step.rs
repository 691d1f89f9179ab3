use super::{DetectorConfig, GestureDetector};
use crate::config::StepConfig;
use crate::events::{DetectorKind, GestureEvent};
use crate::sample::{Axes, MotionSample};
use tracing::{debug, info};

/// Debounce and milestone settings that do not fit [`DetectorConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTuning {
    /// Delta below which an in-progress step is considered finished
    pub reset_delta: f64,
    pub milestone_interval: u64,
}

impl From<&StepConfig> for StepTuning {
    fn from(config: &StepConfig) -> Self {
        Self {
            reset_delta: config.reset_delta,
            milestone_interval: config.milestone_interval.max(1),
        }
    }
}

impl Default for StepTuning {
    fn default() -> Self {
        Self {
            reset_delta: 2.0,
            milestone_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepState {
    pub previous: Axes,
    pub in_progress: bool,
    /// Session-scoped running count
    pub step_count: u64,
    pub last_event: Option<u64>,
}

/// Heuristic pedometer with a two-level debounce
#[derive(Debug, Default)]
pub struct StepDetector {
    tuning: StepTuning,
    state: StepState,
}

impl StepDetector {
    pub fn new(tuning: StepTuning) -> Self {
        Self {
            tuning,
            state: StepState::default(),
        }
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn step_count(&self) -> u64 {
        self.state.step_count
    }

    /// A step registers when the acceleration delta exceeds `config.threshold`
    /// and no step is in progress; the in-progress flag clears once the delta
    /// drops below `tuning.reset_delta`. Every multiple of the milestone
    /// interval yields a `Step` event carrying the count.
    pub fn process_sample(
        config: &DetectorConfig,
        tuning: &StepTuning,
        state: StepState,
        sample: &MotionSample,
    ) -> (StepState, Option<GestureEvent>) {
        let Some(current) = sample.step_accel() else {
            return (state, None);
        };
        let delta = current.delta_magnitude(&state.previous);

        let mut next = StepState {
            previous: current,
            ..state
        };

        if !config.enabled {
            return (next, None);
        }

        if delta > config.threshold && !state.in_progress {
            next.in_progress = true;
            next.step_count = state.step_count + 1;
            debug!("Step registered (delta {:.2}), count {}", delta, next.step_count);

            let interval = tuning.milestone_interval.max(1);
            if next.step_count % interval == 0 {
                info!("Step milestone reached: {}", next.step_count);
                next.last_event = Some(sample.timestamp.max(state.last_event.unwrap_or(0)));
                return (
                    next,
                    Some(GestureEvent::Step {
                        count: next.step_count,
                    }),
                );
            }
        } else if delta < tuning.reset_delta {
            next.in_progress = false;
        }

        (next, None)
    }
}

impl GestureDetector for StepDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Step
    }

    fn process(&mut self, config: &DetectorConfig, sample: &MotionSample) -> Option<GestureEvent> {
        let (next, event) = Self::process_sample(config, &self.tuning, self.state, sample);
        self.state = next;
        event
    }
}
