use crate::config::DesktopConfig;
use crate::dispatcher::{GestureDispatcher, InputSource};
use crate::error::{FitmotionError, Result};
use crate::events::{EventBus, GestureEvent, MotionEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Gesture(GestureEvent),
    Quit,
    Ignored,
}

/// Keys bound to synthetic gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    pub shake: char,
    pub tilt: char,
}

impl KeyMap {
    pub fn from_config(config: &DesktopConfig) -> Result<Self> {
        let shake = config.shake_char().ok_or_else(|| {
            FitmotionError::component("desktop", "shake key must be a single character")
        })?;
        let tilt = config.tilt_char().ok_or_else(|| {
            FitmotionError::component("desktop", "tilt key must be a single character")
        })?;
        Ok(Self { shake, tilt })
    }

    pub fn resolve(&self, code: KeyCode) -> KeyAction {
        match code {
            KeyCode::Char(c) if c.to_ascii_lowercase() == self.shake => {
                KeyAction::Gesture(GestureEvent::Shake)
            }
            KeyCode::Char(c) if c.to_ascii_lowercase() == self.tilt => {
                KeyAction::Gesture(GestureEvent::Tilt)
            }
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            _ => KeyAction::Ignored,
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            shake: 's',
            tilt: 't',
        }
    }
}

struct KeyHandler {
    dispatcher: Arc<GestureDispatcher>,
    event_bus: Arc<EventBus>,
    key_map: KeyMap,
}

impl KeyHandler {
    fn handle(&self, code: KeyCode) -> KeyAction {
        let action = self.key_map.resolve(code);

        match action {
            KeyAction::Gesture(gesture) => {
                if self.dispatcher.handle_gesture(gesture) {
                    info!("Simulated {} gesture", gesture.kind());
                } else {
                    debug!("Simulated {} ignored, detection disabled", gesture.kind());
                }
            }
            KeyAction::Quit => {
                info!("Quit key pressed - requesting shutdown");
                let event = MotionEvent::ShutdownRequested {
                    timestamp: SystemTime::now(),
                    reason: "User requested via keyboard".to_string(),
                };
                if let Err(e) = self.event_bus.publish(event) {
                    warn!("Failed to publish shutdown event: {}", e);
                }
            }
            KeyAction::Ignored => debug!("Key pressed: {:?}", code),
        }

        action
    }
}

/// Keyboard stand-in for motion hardware.
///
/// Only runs while the dispatcher takes its input from the desktop, so it
/// never competes with real sensor input.
pub struct DesktopSimulator {
    handler: Arc<KeyHandler>,
    cancellation_token: CancellationToken,
    running: Arc<AtomicBool>,
}

impl DesktopSimulator {
    pub fn new(dispatcher: Arc<GestureDispatcher>, event_bus: Arc<EventBus>, key_map: KeyMap) -> Self {
        Self {
            handler: Arc::new(KeyHandler {
                dispatcher,
                event_bus,
                key_map,
            }),
            cancellation_token: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key_map(&self) -> KeyMap {
        self.handler.key_map
    }

    /// Handle one key press, synthesizing at most one gesture
    pub fn handle_key(&self, code: KeyCode) -> KeyAction {
        self.handler.handle(code)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start reading key presses from the terminal
    pub async fn start(&self) -> Result<()> {
        if self.handler.dispatcher.input_source() != InputSource::Desktop {
            return Err(FitmotionError::component(
                "desktop",
                "simulator requires desktop input source",
            ));
        }
        if self.running.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let key_map = self.handler.key_map;
        info!(
            "Starting desktop simulator - press '{}' to shake, '{}' to tilt, 'q' to quit",
            key_map.shake, key_map.tilt
        );

        let handler = Arc::clone(&self.handler);
        let cancellation_token = self.cancellation_token.clone();
        let running = Arc::clone(&self.running);
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            let _runtime = runtime_handle.enter();

            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                running.store(false, Ordering::Relaxed);
                return;
            }

            debug!("Raw mode enabled - desktop simulator active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Desktop simulator stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            // Press only, so a held key or release never doubles a gesture
                            if key_event.kind == KeyEventKind::Press
                                && handler.handle(key_event.code) == KeyAction::Quit
                            {
                                break;
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            running.store(false, Ordering::Relaxed);
            debug!("Desktop simulator task exited");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping desktop simulator");
        self.cancellation_token.cancel();

        if self.running.load(Ordering::Relaxed) {
            // Give the poll loop a moment to restore the terminal
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = disable_raw_mode();
        }

        Ok(())
    }
}
