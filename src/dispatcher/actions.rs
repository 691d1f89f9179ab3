use crate::collaborators::{HapticPattern, Haptics, Navigator, NoticeKind, NoticeOptions, Notifier};
use crate::config::ActionsConfig;
use crate::error::CollaboratorError;
use crate::events::{EventBus, GestureEvent, MotionEvent};
use crate::messages;
use crate::picker::Picker;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// The external side-effect sinks
#[derive(Clone)]
pub struct Collaborators {
    pub haptics: Arc<dyn Haptics>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl Collaborators {
    pub fn new(
        haptics: Arc<dyn Haptics>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            haptics,
            notifier,
            navigator,
        }
    }
}

/// Performs the side effects attached to each gesture.
///
/// A failing collaborator is logged and reported on the bus; the remaining
/// side effects of the same gesture still run.
pub struct GestureActions {
    collaborators: Collaborators,
    picker: Picker,
    config: ActionsConfig,
    event_bus: Arc<EventBus>,
    last_shake_action: RwLock<Option<DateTime<Utc>>>,
    gestures_performed: AtomicU64,
}

impl GestureActions {
    pub fn new(
        collaborators: Collaborators,
        config: ActionsConfig,
        picker: Picker,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            collaborators,
            picker,
            config,
            event_bus,
            last_shake_action: RwLock::new(None),
            gestures_performed: AtomicU64::new(0),
        }
    }

    /// Run the side effects for a gesture; returns the message shown
    pub fn perform(&self, gesture: GestureEvent) -> Option<String> {
        let message = match gesture {
            GestureEvent::Shake => self.on_shake(),
            GestureEvent::Tilt => self.on_tilt(),
            GestureEvent::Step { count } => self.on_step(count),
        };

        self.gestures_performed.fetch_add(1, Ordering::Relaxed);

        let event = MotionEvent::GestureDetected {
            gesture,
            message: message.clone(),
            timestamp: SystemTime::now(),
        };
        if let Err(e) = self.event_bus.publish(event) {
            warn!("Failed to publish gesture: {}", e);
        }

        message
    }

    pub fn last_shake_action(&self) -> Option<DateTime<Utc>> {
        *self.last_shake_action.read()
    }

    pub fn gestures_performed(&self) -> u64 {
        self.gestures_performed.load(Ordering::Relaxed)
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.collaborators.notifier
    }

    fn on_shake(&self) -> Option<String> {
        let message = self.picker.choose(messages::MOTIVATIONAL_MESSAGES).copied();

        self.vibrate(HapticPattern::Standard);

        if let Some(message) = message {
            self.notify(
                message,
                NoticeKind::Info,
                NoticeOptions::new()
                    .description(messages::SHAKE_DESCRIPTION)
                    .duration_ms(self.config.shake_notice_ms),
            );
        }

        *self.last_shake_action.write() = Some(Utc::now());

        match self.picker.choose(&self.config.routes) {
            Some(route) => {
                info!("Shake navigation to {}", route);
                if let Err(e) = self.collaborators.navigator.navigate_to(route) {
                    self.report(e);
                }
            }
            None => debug!("No navigation routes configured"),
        }

        message.map(str::to_string)
    }

    fn on_tilt(&self) -> Option<String> {
        let quote = self.picker.choose(messages::HEALTH_QUOTES).copied();

        self.vibrate(HapticPattern::Standard);

        if let Some(quote) = quote {
            self.notify(
                quote,
                NoticeKind::Info,
                NoticeOptions::new()
                    .description(messages::TILT_DESCRIPTION)
                    .duration_ms(self.config.tilt_notice_ms),
            );
        }

        quote.map(str::to_string)
    }

    fn on_step(&self, count: u64) -> Option<String> {
        let encouragement = self.picker.choose(messages::STEP_ENCOURAGEMENTS).copied();

        self.vibrate(HapticPattern::Gentle);

        let mut options = NoticeOptions::new().duration_ms(self.config.step_notice_ms);
        if let Some(encouragement) = encouragement {
            options = options.description(encouragement);
        }
        self.notify(&messages::step_headline(count), NoticeKind::Success, options);

        encouragement.map(str::to_string)
    }

    fn notify(&self, message: &str, kind: NoticeKind, options: NoticeOptions) {
        if let Err(e) = self.collaborators.notifier.notify(message, kind, options) {
            self.report(e);
        }
    }

    /// Fire-and-forget; the detection loop never waits on the motor
    fn vibrate(&self, pattern: HapticPattern) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No runtime for haptics, skipping vibration");
                return;
            }
        };

        let haptics = Arc::clone(&self.collaborators.haptics);
        let event_bus = Arc::clone(&self.event_bus);
        handle.spawn(async move {
            if let Err(e) = haptics.vibrate(pattern).await {
                report_failure(&event_bus, e);
            }
        });
    }

    fn report(&self, error: CollaboratorError) {
        report_failure(&self.event_bus, error);
    }
}

fn report_failure(event_bus: &EventBus, error: CollaboratorError) {
    // EventBus::publish logs the failure at warn
    let event = MotionEvent::CollaboratorFailed {
        collaborator: error.collaborator().to_string(),
        error: error.to_string(),
    };
    if event_bus.publish(event).is_err() {
        warn!("{} collaborator failed: {}", error.collaborator(), error);
    }
}
