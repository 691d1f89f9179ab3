use super::{GestureEngine, ShutdownReason};
use crate::error::{FitmotionError, Result};
use crate::events::{EventFilter, EventReceiver, MotionEvent};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl GestureEngine {
    /// Run until a signal or a shutdown request on the bus, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Gesture engine is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| FitmotionError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| FitmotionError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.setup_shutdown_listener(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| FitmotionError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Gesture engine shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: &SharedSender) {
        // SIGTERM - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(shutdown_sender);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }

    /// Turn `ShutdownRequested` bus events (the quit key) into a shutdown
    fn setup_shutdown_listener(&self, shutdown_sender: &SharedSender) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "shutdown".to_string(),
        );
        let shutdown_sender = Arc::clone(shutdown_sender);
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let reason = tokio::select! {
                _ = token.cancelled() => return,
                event = receiver.recv() => match event {
                    Ok(MotionEvent::ShutdownRequested { .. }) => ShutdownReason::UserRequest,
                    Ok(_) => return,
                    Err(e) => ShutdownReason::Error(e.to_string()),
                },
            };

            if let Some(sender) = shutdown_sender.lock().await.take() {
                let _ = sender.send(reason);
            }
        });
    }

    /// Ask a running engine to stop
    pub fn request_shutdown(&self, reason: &str) -> Result<()> {
        self.event_bus.publish(MotionEvent::ShutdownRequested {
            timestamp: std::time::SystemTime::now(),
            reason: reason.to_string(),
        })?;
        Ok(())
    }
}
