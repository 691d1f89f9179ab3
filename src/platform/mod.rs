//! Platform motion sources.
//!
//! A [`MotionPlatform`] is checked once at startup for its capabilities and,
//! where the platform gates motion data behind a user gesture, asked for
//! permission. After that it only has to push samples into the channel it is
//! handed by the sampler.

mod mock;
mod replay;

pub use mock::MockMotionPlatform;
pub use replay::ReplayPlatform;

use crate::error::SensorError;
use crate::sample::MotionSample;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// What the platform can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub motion: bool,
    pub orientation: bool,
    /// Motion data needs an explicit runtime permission grant
    pub requires_permission: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        motion: false,
        orientation: false,
        requires_permission: false,
    };

    pub const FULL: Capabilities = Capabilities {
        motion: true,
        orientation: true,
        requires_permission: false,
    };

    pub fn supported(&self) -> bool {
        self.motion || self.orientation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
}

/// A source of raw motion and orientation samples
#[async_trait]
pub trait MotionPlatform: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Only called when `capabilities().requires_permission` is set
    async fn request_permission(&self) -> PermissionState;

    /// Start pushing samples into `sink`
    fn open_stream(&self, sink: mpsc::Sender<MotionSample>) -> Result<(), SensorError>;

    /// Stop pushing samples; must tolerate being called when not streaming
    fn close_stream(&self);
}

/// Platform with no motion hardware at all
#[derive(Debug, Default)]
pub struct UnsupportedPlatform;

#[async_trait]
impl MotionPlatform for UnsupportedPlatform {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Denied
    }

    fn open_stream(&self, _sink: mpsc::Sender<MotionSample>) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    fn close_stream(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_platform() {
        let platform = UnsupportedPlatform;
        assert!(!platform.capabilities().supported());

        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(platform.open_stream(tx), Err(SensorError::Unsupported));
        assert_eq!(platform.request_permission().await, PermissionState::Denied);
    }

    #[test]
    fn test_capabilities_supported() {
        assert!(Capabilities::FULL.supported());
        let orientation_only = Capabilities {
            motion: false,
            orientation: true,
            requires_permission: true,
        };
        assert!(orientation_only.supported());
    }
}
