use super::types::{ComponentState, ShutdownReason};
use crate::collaborators::Notifier;
use crate::config::FitmotionConfig;
use crate::desktop::{DesktopSimulator, KeyAction};
use crate::dispatcher::{announce, Collaborators, GestureDispatcher, InputSource};
use crate::error::{FitmotionError, Result, SensorError};
use crate::events::{DetectorKind, EventBus, EventMetrics, SensorStatus};
use crate::picker::Picker;
use crate::platform::MotionPlatform;
use crate::sampler::MotionSampler;
use crossterm::event::KeyCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the sampler, dispatcher and desktop fallback for one app session
pub struct GestureEngine {
    pub(super) config: FitmotionConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) sampler: Arc<MotionSampler>,
    pub(super) dispatcher: Arc<GestureDispatcher>,
    pub(super) notifier: Arc<dyn Notifier>,

    pub(super) desktop: Option<DesktopSimulator>,
    pub(super) force_desktop: bool,
    /// Read keys from the terminal when the desktop simulator is active
    pub(super) interactive: bool,
    pub(super) sensor_notice_shown: AtomicBool,
    pub(super) metrics: Arc<parking_lot::Mutex<EventMetrics>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl GestureEngine {
    pub fn builder() -> GestureEngineBuilder {
        GestureEngineBuilder::new()
    }

    pub fn config(&self) -> &FitmotionConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn sampler(&self) -> &Arc<MotionSampler> {
        &self.sampler
    }

    pub fn dispatcher(&self) -> &Arc<GestureDispatcher> {
        &self.dispatcher
    }

    pub fn input_source(&self) -> InputSource {
        self.dispatcher.input_source()
    }

    pub fn metrics(&self) -> EventMetrics {
        self.metrics.lock().clone()
    }

    /// Feed a key to the desktop simulator, if it is active
    pub fn simulate_key(&self, code: KeyCode) -> Option<KeyAction> {
        self.desktop.as_ref().map(|desktop| desktop.handle_key(code))
    }

    /// Flip shake detection and confirm it to the user.
    ///
    /// Turning detection on while no input is attached retries the sensor
    /// start, which is how a refused permission gets asked again. If the
    /// retry fails the detector stays off and the sensor problem is shown
    /// instead of a confirmation.
    pub async fn toggle_shake_detection(&self) -> bool {
        if !self.dispatcher.is_shake_enabled() {
            if let Err(e) = self.attach_input().await {
                warn!("Shake detection stays disabled: {}", e);
                announce::announce_sensor_error(self.notifier.as_ref(), &e);
                return false;
            }
        }
        let enabled = self.dispatcher.toggle_shake_detection();
        announce::announce_toggle(self.notifier.as_ref(), DetectorKind::Shake, enabled);
        enabled
    }

    /// Flip tilt and step detection and confirm it to the user
    pub async fn toggle_tilt_detection(&self) -> bool {
        if !self.dispatcher.is_tilt_enabled() {
            if let Err(e) = self.attach_input().await {
                warn!("Tilt detection stays disabled: {}", e);
                announce::announce_sensor_error(self.notifier.as_ref(), &e);
                return false;
            }
        }
        let enabled = self.dispatcher.toggle_tilt_detection();
        announce::announce_toggle(self.notifier.as_ref(), DetectorKind::Tilt, enabled);
        enabled
    }

    pub fn set_shake_threshold(&self, value: f64) -> Result<f64> {
        self.dispatcher.set_shake_threshold(value)
    }

    /// Make sure some input feeds the dispatcher, starting sensors if needed
    async fn attach_input(&self) -> std::result::Result<(), SensorError> {
        if self.dispatcher.input_source() != InputSource::Inactive || self.force_desktop {
            return Ok(());
        }
        if self.sampler.status() == SensorStatus::Stopped {
            return Err(SensorError::Stopped);
        }

        info!("Retrying motion sensor start");
        self.sampler.start().await?;
        self.dispatcher.set_input_source(InputSource::Sensors)?;
        self.set_component_state("sampler", ComponentState::Running)
            .await;
        Ok(())
    }

    pub(super) fn announce_sensor_error_once(&self, error: &SensorError) {
        if !self.sensor_notice_shown.swap(true, Ordering::Relaxed) {
            announce::announce_sensor_error(self.notifier.as_ref(), error);
        }
    }
}

/// Builder for [`GestureEngine`]
pub struct GestureEngineBuilder {
    config: FitmotionConfig,
    platform: Option<Arc<dyn MotionPlatform>>,
    collaborators: Option<Collaborators>,
    picker: Option<Picker>,
    force_desktop: bool,
    interactive: bool,
}

impl GestureEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: FitmotionConfig::default(),
            platform: None,
            collaborators: None,
            picker: None,
            force_desktop: false,
            interactive: true,
        }
    }

    pub fn config(mut self, config: FitmotionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn platform(mut self, platform: Arc<dyn MotionPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Fixed seed for message and route selection
    pub fn picker(mut self, picker: Picker) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Use the desktop simulator even when sensors are available
    pub fn force_desktop(mut self, force: bool) -> Self {
        self.force_desktop = force;
        self
    }

    /// Whether the desktop simulator reads the terminal
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn build(self) -> Result<GestureEngine> {
        self.config.validate()?;

        let platform = self
            .platform
            .ok_or_else(|| FitmotionError::component("engine", "motion platform is required"))?;
        let collaborators = self
            .collaborators
            .ok_or_else(|| FitmotionError::component("engine", "collaborators are required"))?;

        let event_bus = Arc::new(EventBus::new(self.config.system.event_bus_capacity));
        let sampler = Arc::new(MotionSampler::new(
            platform,
            self.config.sampler.clone(),
            Arc::clone(&event_bus),
        ));
        let notifier = Arc::clone(&collaborators.notifier);
        let dispatcher = Arc::new(GestureDispatcher::new(
            &self.config,
            Arc::clone(&sampler),
            collaborators,
            self.picker.unwrap_or_default(),
            Arc::clone(&event_bus),
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(GestureEngine {
            config: self.config,
            event_bus,
            sampler,
            dispatcher,
            notifier,
            desktop: None,
            force_desktop: self.force_desktop,
            interactive: self.interactive,
            sensor_notice_shown: AtomicBool::new(false),
            metrics: Arc::new(parking_lot::Mutex::new(EventMetrics::default())),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }
}

impl Default for GestureEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
