use super::{ComponentState, GestureEngine};
use crate::error::{FitmotionError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl GestureEngine {
    /// Stop every component in reverse start order
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        if let Err(e) = self.stop_component("desktop").await {
            error!("Error stopping desktop: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_component("dispatcher").await {
            error!("Error stopping dispatcher: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_component("sampler").await {
            error!("Error stopping sampler: {}", e);
            exit_code = 1;
        }

        // Metrics listener and shutdown listener
        self.cancellation_token.cancel();
        self.metrics.lock().log_summary();
        self.log_component_states().await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_component(&mut self, component: &str) -> Result<()> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let result = match component {
            "desktop" => match self.desktop.take() {
                Some(desktop) => match timeout(Duration::from_secs(2), desktop.stop()).await {
                    Ok(result) => result,
                    Err(_) => Err(FitmotionError::system(format!(
                        "{} component stop timeout",
                        component
                    ))),
                },
                None => Ok(()),
            },
            "dispatcher" => {
                self.dispatcher.shutdown();
                Ok(())
            }
            "sampler" => {
                self.sampler.stop();
                Ok(())
            }
            other => Err(FitmotionError::component(
                "engine".to_string(),
                format!("unknown component {}", other),
            )),
        };

        match &result {
            Ok(()) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
            }
            Err(e) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
            }
        }

        result
    }
}
