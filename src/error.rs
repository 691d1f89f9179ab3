use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitmotionError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Invalid shake threshold: {value}")]
    InvalidThreshold { value: f64 },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl FitmotionError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures while bringing up the motion/orientation stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Motion permission denied")]
    PermissionDenied,

    #[error("Motion sensors are not supported on this platform")]
    Unsupported,

    #[error("Failed to open motion stream: {details}")]
    StreamOpen { details: String },

    #[error("Motion sampler has not been started")]
    NotStarted,

    #[error("Motion sampler has been stopped")]
    Stopped,
}

impl SensorError {
    /// Errors after which the engine switches to keyboard simulation
    pub fn is_fallback(&self) -> bool {
        matches!(self, SensorError::Unsupported)
    }

    pub fn user_message(&self) -> String {
        match self {
            SensorError::PermissionDenied => "Motion detection permission denied".to_string(),
            SensorError::Unsupported => {
                "Motion sensors unavailable, use the keyboard to simulate gestures".to_string()
            }
            SensorError::StreamOpen { details } => {
                format!("Motion detection could not start: {}", details)
            }
            SensorError::NotStarted => "Motion detection has not started".to_string(),
            SensorError::Stopped => "Motion detection is stopped".to_string(),
        }
    }
}

/// A side-effect call into haptics, notification or navigation failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Haptics failed: {0}")]
    Haptics(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

impl CollaboratorError {
    pub fn collaborator(&self) -> &'static str {
        match self {
            CollaboratorError::Haptics(_) => "haptics",
            CollaboratorError::Notification(_) => "notification",
            CollaboratorError::Navigation(_) => "navigation",
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Invalid sample on line {line}: {details}")]
    Parse { line: usize, details: String },
}

pub type Result<T> = std::result::Result<T, FitmotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_error_fallback() {
        assert!(SensorError::Unsupported.is_fallback());
        assert!(!SensorError::PermissionDenied.is_fallback());
        assert!(SensorError::PermissionDenied
            .user_message()
            .contains("permission denied"));
    }

    #[test]
    fn test_error_conversion() {
        let err: FitmotionError = SensorError::Unsupported.into();
        assert!(matches!(err, FitmotionError::Sensor(SensorError::Unsupported)));

        let err: FitmotionError = CollaboratorError::Haptics("no motor".to_string()).into();
        assert!(err.to_string().contains("no motor"));
    }

    #[test]
    fn test_collaborator_name() {
        assert_eq!(
            CollaboratorError::Navigation("x".to_string()).collaborator(),
            "navigation"
        );
    }
}
