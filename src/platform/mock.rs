use super::{Capabilities, MotionPlatform, PermissionState};
use crate::error::SensorError;
use crate::sample::MotionSample;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Mock platform for testing without motion hardware.
///
/// Samples are pushed by hand with [`MockMotionPlatform::push`].
pub struct MockMotionPlatform {
    capabilities: Capabilities,
    permission: Mutex<PermissionState>,
    sink: Mutex<Option<mpsc::Sender<MotionSample>>>,
    opened: AtomicU32,
    closed: AtomicU32,
    permission_requests: AtomicU32,
}

impl MockMotionPlatform {
    /// Fully capable platform that needs no permission
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::FULL, PermissionState::Granted)
    }

    pub fn with_capabilities(capabilities: Capabilities, permission: PermissionState) -> Self {
        Self {
            capabilities,
            permission: Mutex::new(permission),
            sink: Mutex::new(None),
            opened: AtomicU32::new(0),
            closed: AtomicU32::new(0),
            permission_requests: AtomicU32::new(0),
        }
    }

    /// Platform that gates motion behind a permission prompt
    pub fn gated(permission: PermissionState) -> Self {
        Self::with_capabilities(
            Capabilities {
                requires_permission: true,
                ..Capabilities::FULL
            },
            permission,
        )
    }

    /// Deliver a sample; returns false when nothing is listening
    pub fn push(&self, sample: MotionSample) -> bool {
        let sink = self.sink.lock();
        match sink.as_ref() {
            Some(sender) => sender.try_send(sample).is_ok(),
            None => {
                debug!("Mock sample dropped, stream closed");
                false
            }
        }
    }

    /// Answer future permission prompts differently, e.g. after the user
    /// changed the browser setting
    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock() = permission;
    }

    pub fn is_streaming(&self) -> bool {
        self.sink.lock().is_some()
    }

    pub fn open_count(&self) -> u32 {
        self.opened.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> u32 {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn permission_requests(&self) -> u32 {
        self.permission_requests.load(Ordering::Relaxed)
    }
}

impl Default for MockMotionPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MotionPlatform for MockMotionPlatform {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn request_permission(&self) -> PermissionState {
        self.permission_requests.fetch_add(1, Ordering::Relaxed);
        *self.permission.lock()
    }

    fn open_stream(&self, sink: mpsc::Sender<MotionSample>) -> Result<(), SensorError> {
        if !self.capabilities.supported() {
            return Err(SensorError::Unsupported);
        }
        self.opened.fetch_add(1, Ordering::Relaxed);
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn close_stream(&self) {
        if self.sink.lock().take().is_some() {
            self.closed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
