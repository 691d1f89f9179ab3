use super::{ComponentState, GestureEngine};
use crate::desktop::{DesktopSimulator, KeyMap};
use crate::dispatcher::{announce, InputSource};
use crate::error::{Result, SensorError};
use crate::events::{EventFilter, EventReceiver};
use crate::messages;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl GestureEngine {
    /// Register components and start the bus metrics listener
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing gesture engine components");

        let mut states = self.component_states.lock().await;
        states.insert("sampler".to_string(), ComponentState::Stopped);
        states.insert("dispatcher".to_string(), ComponentState::Stopped);
        states.insert("desktop".to_string(), ComponentState::Stopped);
        drop(states);

        self.spawn_metrics_listener();

        info!("All components initialized successfully");
        Ok(())
    }

    /// Bring up motion input, falling back to the desktop simulator.
    ///
    /// Sensor problems never fail startup: an unsupported platform switches
    /// to the simulator, a refused permission leaves detection disabled.
    /// Returns the input source that ended up active.
    pub async fn start(&mut self) -> Result<InputSource> {
        info!("Starting gesture engine");

        let source = if self.force_desktop {
            info!("Desktop simulation forced");
            self.activate_desktop().await?;
            InputSource::Desktop
        } else {
            self.start_sensors().await?
        };

        self.set_component_state("dispatcher", ComponentState::Running)
            .await;

        if let Some(hint) = messages::feature_hint(
            self.dispatcher.is_shake_enabled(),
            self.dispatcher.is_tilt_enabled(),
        ) {
            announce::announce_hint(self.notifier.as_ref(), hint);
        }

        info!("Gesture engine started with {:?} input", source);
        Ok(source)
    }

    async fn start_sensors(&mut self) -> Result<InputSource> {
        self.set_component_state("sampler", ComponentState::Starting)
            .await;
        info!("Starting motion sensors on {} platform", self.sampler.platform_name());

        match self.sampler.start().await {
            Ok(_) => {
                self.dispatcher
                    .set_input_source(InputSource::Sensors)
                    .map_err(|e| {
                        error!("Failed to attach detectors to the sampler: {}", e);
                        e
                    })?;
                self.set_component_state("sampler", ComponentState::Running)
                    .await;
                Ok(InputSource::Sensors)
            }
            Err(e) if e.is_fallback() => {
                info!("Motion sensors unsupported, falling back to desktop simulator");
                self.set_component_state("sampler", ComponentState::Stopped)
                    .await;
                self.announce_sensor_error_once(&e);
                self.activate_desktop().await?;
                Ok(InputSource::Desktop)
            }
            Err(SensorError::PermissionDenied) => {
                warn!("Motion permission denied, gesture detection stays disabled");
                self.set_component_state("sampler", ComponentState::Failed)
                    .await;
                self.announce_sensor_error_once(&SensorError::PermissionDenied);
                self.dispatcher.disable_all();
                Ok(InputSource::Inactive)
            }
            Err(e) => {
                self.set_component_state("sampler", ComponentState::Failed)
                    .await;
                Err(e.into())
            }
        }
    }

    async fn activate_desktop(&mut self) -> Result<()> {
        self.set_component_state("desktop", ComponentState::Starting)
            .await;

        self.dispatcher.set_input_source(InputSource::Desktop)?;

        let key_map = KeyMap::from_config(&self.config.desktop)?;
        let simulator = DesktopSimulator::new(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.event_bus),
            key_map,
        );

        if self.interactive {
            simulator.start().await.map_err(|e| {
                error!("Failed to start desktop simulator: {}", e);
                e
            })?;
        } else {
            debug!("Desktop simulator running without terminal input");
        }

        self.desktop = Some(simulator);
        self.set_component_state("desktop", ComponentState::Running)
            .await;
        Ok(())
    }

    fn spawn_metrics_listener(&self) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::All,
            "metrics".to_string(),
        );
        let metrics = Arc::clone(&self.metrics);
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = receiver.recv() => match event {
                        Ok(event) => metrics.lock().record_event(&event),
                        Err(_) => break,
                    },
                }
            }
            debug!("Metrics listener exited");
        });
    }
}
