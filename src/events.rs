use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Discrete gesture raised by a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureEvent {
    Shake,
    Tilt,
    Step { count: u64 },
}

impl GestureEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GestureEvent::Shake => "shake",
            GestureEvent::Tilt => "tilt",
            GestureEvent::Step { .. } => "step",
        }
    }
}

/// Which detector a toggle or status refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    Shake,
    Tilt,
    Step,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Shake => "shake",
            DetectorKind::Tilt => "tilt",
            DetectorKind::Step => "step",
        }
    }
}

/// State of the platform motion stream as seen by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    /// Not started yet
    Idle,
    /// Capability check passed and permission (if any) granted
    Ready,
    PermissionDenied,
    Unsupported,
    Stopped,
}

/// Events that can occur in the gesture engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MotionEvent {
    /// A gesture was dispatched to the collaborators
    GestureDetected {
        gesture: GestureEvent,
        message: Option<String>,
        timestamp: SystemTime,
    },
    /// A detector was switched on or off
    DetectionToggled {
        detector: DetectorKind,
        enabled: bool,
        timestamp: SystemTime,
    },
    /// The motion stream changed state
    SensorStatusChanged {
        status: SensorStatus,
        timestamp: SystemTime,
    },
    /// A haptics, notification or navigation call failed and was skipped
    CollaboratorFailed { collaborator: String, error: String },
    /// Engine shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl MotionEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            MotionEvent::GestureDetected { timestamp, .. } => *timestamp,
            MotionEvent::DetectionToggled { timestamp, .. } => *timestamp,
            MotionEvent::SensorStatusChanged { timestamp, .. } => *timestamp,
            MotionEvent::CollaboratorFailed { .. } => SystemTime::now(),
            MotionEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MotionEvent::GestureDetected {
                gesture: GestureEvent::Step { count },
                ..
            } => format!("Step milestone: {} steps", count),
            MotionEvent::GestureDetected { gesture, .. } => {
                format!("Gesture detected: {}", gesture.kind())
            }
            MotionEvent::DetectionToggled {
                detector, enabled, ..
            } => format!(
                "{} detection {}",
                detector.as_str(),
                if *enabled { "enabled" } else { "disabled" }
            ),
            MotionEvent::SensorStatusChanged { status, .. } => {
                format!("Sensor status: {:?}", status)
            }
            MotionEvent::CollaboratorFailed {
                collaborator,
                error,
            } => format!("{} failed: {}", collaborator, error),
            MotionEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MotionEvent::GestureDetected { .. } => "gesture_detected",
            MotionEvent::DetectionToggled { .. } => "detection_toggled",
            MotionEvent::SensorStatusChanged { .. } => "sensor_status_changed",
            MotionEvent::CollaboratorFailed { .. } => "collaborator_failed",
            MotionEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MotionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<MotionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event. Publishing with no
    /// subscribers is not an error; listeners are optional.
    pub fn publish(&self, event: MotionEvent) -> Result<usize, EventBusError> {
        match &event {
            MotionEvent::GestureDetected { gesture, .. } => {
                info!("Gesture published: {}", gesture.kind());
            }
            MotionEvent::CollaboratorFailed {
                collaborator,
                error,
            } => {
                warn!("Collaborator {} failed: {}", collaborator, error);
            }
            MotionEvent::SensorStatusChanged { status, .. } => match status {
                SensorStatus::PermissionDenied => warn!("Motion permission denied"),
                SensorStatus::Unsupported => info!("Motion sensors unsupported"),
                _ => debug!("Sensor status changed to {:?}", status),
            },
            MotionEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        if self.sender.receiver_count() == 0 {
            return Ok(0);
        }

        // Receivers can still drop between the count check and the send
        self.sender.send(event).map_err(|e| {
            error!("Event publish failed: {}", e);
            EventBusError::PublishFailed {
                details: e.to_string(),
            }
        })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept gestures of the given kinds
    Gestures(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &MotionEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Gestures(kinds) => {
                if let MotionEvent::GestureDetected { gesture, .. } = event {
                    kinds.contains(&gesture.kind())
                } else {
                    false
                }
            }
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<MotionEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<MotionEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<MotionEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<MotionEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

/// Event counters kept for the shutdown summary
#[derive(Debug, Default, Clone)]
pub struct EventMetrics {
    pub total_events: u64,
    pub events_by_type: HashMap<&'static str, u64>,
    pub gestures_by_kind: HashMap<&'static str, u64>,
    pub collaborator_failures: u64,
    pub last_event_time: Option<SystemTime>,
}

impl EventMetrics {
    /// Record an event
    pub fn record_event(&mut self, event: &MotionEvent) {
        self.total_events += 1;
        *self.events_by_type.entry(event.event_type()).or_insert(0) += 1;
        self.last_event_time = Some(event.timestamp());

        match event {
            MotionEvent::GestureDetected { gesture, .. } => {
                *self.gestures_by_kind.entry(gesture.kind()).or_insert(0) += 1;
            }
            MotionEvent::CollaboratorFailed { .. } => self.collaborator_failures += 1,
            _ => {}
        }
    }

    pub fn gesture_count(&self, kind: &str) -> u64 {
        self.gestures_by_kind.get(kind).copied().unwrap_or(0)
    }

    /// Log a summary of everything recorded so far
    pub fn log_summary(&self) {
        info!("Event summary:");
        info!("  Total events: {}", self.total_events);
        info!("  Collaborator failures: {}", self.collaborator_failures);

        for (kind, count) in &self.gestures_by_kind {
            info!("  {} gestures: {}", kind, count);
        }
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
