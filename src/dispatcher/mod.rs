//! Gesture dispatcher.
//!
//! Owns the enable flags and live detector configs, runs one task per enabled
//! detector on its own sampler subscription, and hands every emitted gesture
//! to [`GestureActions`].
//!
//! Toggles only change state and return the new flag. Confirmation notices
//! are posted by the caller through [`announce`].

mod actions;
pub mod announce;

#[cfg(test)]
mod tests;

pub use actions::{Collaborators, GestureActions};

use crate::config::{FitmotionConfig, ShakeConfig};
use crate::detector::{
    DetectorConfig, GestureDetector, ShakeDetector, StepDetector, StepTuning, TiltDetector,
};
use crate::error::{FitmotionError, Result, SensorError};
use crate::events::{DetectorKind, EventBus, GestureEvent, MotionEvent};
use crate::picker::Picker;
use crate::sampler::{MotionSampler, SampleSubscription};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where gestures come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// No input; detectors keep their flags but nothing runs
    Inactive,
    /// Detector tasks on the motion sampler
    Sensors,
    /// Gestures synthesized by the desktop simulator
    Desktop,
}

/// One detector with its live config and running task
struct DetectorSlot<D> {
    kind: DetectorKind,
    config: Arc<RwLock<DetectorConfig>>,
    detector: Arc<Mutex<D>>,
    task: Mutex<Option<CancellationToken>>,
}

impl<D: GestureDetector + 'static> DetectorSlot<D> {
    fn new(kind: DetectorKind, config: DetectorConfig, detector: D) -> Self {
        Self {
            kind,
            config: Arc::new(RwLock::new(config)),
            detector: Arc::new(Mutex::new(detector)),
            task: Mutex::new(None),
        }
    }

    fn is_enabled(&self) -> bool {
        self.config.read().enabled
    }

    fn set_enabled(&self, enabled: bool) {
        self.config.write().enabled = enabled;
    }

    fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Subscribe to the sampler and start feeding the detector
    fn spawn(
        &self,
        sampler: &MotionSampler,
        actions: &Arc<GestureActions>,
    ) -> std::result::Result<(), SensorError> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }

        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| SensorError::StreamOpen {
                details: e.to_string(),
            })?;
        let subscription = sampler.subscribe(self.kind.as_str())?;

        let token = CancellationToken::new();
        handle.spawn(run_detector(
            subscription,
            Arc::clone(&self.detector),
            Arc::clone(&self.config),
            Arc::clone(actions),
            token.clone(),
        ));
        *task = Some(token);

        debug!("{} detector task started", self.kind.as_str());
        Ok(())
    }

    fn cancel(&self) {
        if let Some(token) = self.task.lock().take() {
            token.cancel();
            debug!("{} detector task cancelled", self.kind.as_str());
        }
    }
}

async fn run_detector<D: GestureDetector>(
    mut subscription: SampleSubscription,
    detector: Arc<Mutex<D>>,
    config: Arc<RwLock<DetectorConfig>>,
    actions: Arc<GestureActions>,
    token: CancellationToken,
) {
    loop {
        let sample = tokio::select! {
            _ = token.cancelled() => break,
            sample = subscription.recv() => sample,
        };

        let Some(sample) = sample else {
            debug!("Sample stream ended for '{}'", subscription.consumer());
            break;
        };

        // Disabling is level-triggered: a sample read after the flag flips
        // sees the disabled config
        let current = *config.read();
        let gesture = detector.lock().process(&current, &sample);

        if let Some(gesture) = gesture {
            actions.perform(gesture);
        }
    }
}

/// Owns detection state and routes gestures to their side effects
pub struct GestureDispatcher {
    shake: DetectorSlot<ShakeDetector>,
    tilt: DetectorSlot<TiltDetector>,
    step: DetectorSlot<StepDetector>,
    shake_limits: ShakeConfig,
    source: RwLock<InputSource>,
    sampler: Arc<MotionSampler>,
    actions: Arc<GestureActions>,
    event_bus: Arc<EventBus>,
}

impl GestureDispatcher {
    pub fn new(
        config: &FitmotionConfig,
        sampler: Arc<MotionSampler>,
        collaborators: Collaborators,
        picker: Picker,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let actions = Arc::new(GestureActions::new(
            collaborators,
            config.actions.clone(),
            picker,
            Arc::clone(&event_bus),
        ));

        Self {
            shake: DetectorSlot::new(
                DetectorKind::Shake,
                config.shake.detector_config(),
                ShakeDetector::new(),
            ),
            tilt: DetectorSlot::new(
                DetectorKind::Tilt,
                config.tilt.detector_config(),
                TiltDetector::new(),
            ),
            step: DetectorSlot::new(
                DetectorKind::Step,
                config.step.detector_config(config.tilt.enabled),
                StepDetector::new(StepTuning::from(&config.step)),
            ),
            shake_limits: config.shake.clone(),
            source: RwLock::new(InputSource::Inactive),
            sampler,
            actions,
            event_bus,
        }
    }

    pub fn is_shake_enabled(&self) -> bool {
        self.shake.is_enabled()
    }

    pub fn is_tilt_enabled(&self) -> bool {
        self.tilt.is_enabled()
    }

    pub fn is_step_enabled(&self) -> bool {
        self.step.is_enabled()
    }

    pub fn shake_threshold(&self) -> f64 {
        self.shake.config.read().threshold
    }

    /// When the last shake ran its side effects
    pub fn last_shake_action(&self) -> Option<DateTime<Utc>> {
        self.actions.last_shake_action()
    }

    /// Steps counted this session
    pub fn step_count(&self) -> u64 {
        self.step.detector.lock().step_count()
    }

    pub fn input_source(&self) -> InputSource {
        *self.source.read()
    }

    pub fn actions(&self) -> &Arc<GestureActions> {
        &self.actions
    }

    /// Switch input. `Sensors` starts a task for every enabled detector.
    pub fn set_input_source(&self, source: InputSource) -> std::result::Result<(), SensorError> {
        self.stop_tasks();
        *self.source.write() = source;

        if source == InputSource::Sensors {
            if let Err(e) = self.start_enabled_tasks() {
                self.stop_tasks();
                *self.source.write() = InputSource::Inactive;
                return Err(e);
            }
        }

        info!("Gesture input source: {:?}", source);
        Ok(())
    }

    /// Flip shake detection; returns the new state
    pub fn toggle_shake_detection(&self) -> bool {
        let enabled = !self.shake.is_enabled();
        let enabled = self.apply_toggle(&self.shake, enabled);
        self.publish_toggle(DetectorKind::Shake, enabled);
        enabled
    }

    /// Flip tilt detection; step detection follows. Returns the new state.
    pub fn toggle_tilt_detection(&self) -> bool {
        let enabled = !self.tilt.is_enabled();
        let enabled = self.apply_toggle(&self.tilt, enabled);
        self.apply_toggle(&self.step, enabled);
        self.publish_toggle(DetectorKind::Tilt, enabled);
        enabled
    }

    /// Turn everything off, e.g. after motion permission was refused
    pub fn disable_all(&self) {
        if self.is_shake_enabled() {
            self.toggle_shake_detection();
        }
        if self.is_tilt_enabled() {
            self.toggle_tilt_detection();
        }
    }

    /// Update the live shake threshold.
    ///
    /// The value is clamped into the sensitivity range; the applied value is
    /// returned.
    pub fn set_shake_threshold(&self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(FitmotionError::InvalidThreshold { value });
        }

        let applied = self.shake_limits.clamp_threshold(value);
        self.shake.config.write().threshold = applied;

        if applied != value {
            debug!("Shake threshold {} clamped to {}", value, applied);
        }
        info!("Shake threshold set to {}", applied);
        Ok(applied)
    }

    /// Dispatch a gesture produced outside the detectors.
    ///
    /// Ignored unless the matching detector is enabled. Returns whether the
    /// gesture's side effects ran.
    pub fn handle_gesture(&self, gesture: GestureEvent) -> bool {
        let enabled = match gesture {
            GestureEvent::Shake => self.is_shake_enabled(),
            GestureEvent::Tilt => self.is_tilt_enabled(),
            GestureEvent::Step { .. } => self.is_step_enabled(),
        };

        if !enabled {
            debug!("Ignoring {} gesture, detection disabled", gesture.kind());
            return false;
        }

        self.actions.perform(gesture);
        true
    }

    /// Stop every detector task and detach from input
    pub fn shutdown(&self) {
        self.stop_tasks();
        *self.source.write() = InputSource::Inactive;
        debug!(
            "Dispatcher shut down after {} gestures",
            self.actions.gestures_performed()
        );
    }

    pub fn running_tasks(&self) -> usize {
        [
            self.shake.is_running(),
            self.tilt.is_running(),
            self.step.is_running(),
        ]
        .iter()
        .filter(|running| **running)
        .count()
    }

    fn apply_toggle<D: GestureDetector + 'static>(
        &self,
        slot: &DetectorSlot<D>,
        enabled: bool,
    ) -> bool {
        slot.set_enabled(enabled);

        if !enabled {
            slot.cancel();
            return false;
        }

        if self.input_source() == InputSource::Sensors {
            if let Err(e) = slot.spawn(&self.sampler, &self.actions) {
                warn!(
                    "Could not start {} detection: {}",
                    slot.kind.as_str(),
                    e
                );
                slot.set_enabled(false);
                return false;
            }
        }

        true
    }

    fn start_enabled_tasks(&self) -> std::result::Result<(), SensorError> {
        if self.shake.is_enabled() {
            self.shake.spawn(&self.sampler, &self.actions)?;
        }
        if self.tilt.is_enabled() {
            self.tilt.spawn(&self.sampler, &self.actions)?;
        }
        if self.step.is_enabled() {
            self.step.spawn(&self.sampler, &self.actions)?;
        }
        Ok(())
    }

    fn stop_tasks(&self) {
        self.shake.cancel();
        self.tilt.cancel();
        self.step.cancel();
    }

    fn publish_toggle(&self, detector: DetectorKind, enabled: bool) {
        info!(
            "{} detection {}",
            detector.as_str(),
            if enabled { "enabled" } else { "disabled" }
        );

        let event = MotionEvent::DetectionToggled {
            detector,
            enabled,
            timestamp: SystemTime::now(),
        };
        if let Err(e) = self.event_bus.publish(event) {
            warn!("Failed to publish toggle: {}", e);
        }
    }
}

impl Drop for GestureDispatcher {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}
