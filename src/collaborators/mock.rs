use super::{HapticPattern, Haptics, Navigator, NoticeKind, NoticeOptions, Notifier};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records vibrations; can be told to fail
#[derive(Debug, Default)]
pub struct RecordingHaptics {
    calls: Mutex<Vec<HapticPattern>>,
    fail: AtomicBool,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device without a vibration motor
    pub fn failing() -> Self {
        let haptics = Self::default();
        haptics.set_failing(true);
        haptics
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<HapticPattern> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Haptics for RecordingHaptics {
    async fn vibrate(&self, pattern: HapticPattern) -> Result<(), CollaboratorError> {
        self.calls.lock().push(pattern);
        if self.fail.load(Ordering::Relaxed) {
            return Err(CollaboratorError::Haptics("vibration unsupported".to_string()));
        }
        Ok(())
    }
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub options: NoticeOptions,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        options: NoticeOptions,
    ) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(CollaboratorError::Notification("toaster offline".to_string()));
        }
        self.notices.lock().push(Notice {
            message: message.to_string(),
            kind,
            options,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let navigator = Self::default();
        navigator.set_failing(true);
        navigator
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.routes.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: &str) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(CollaboratorError::Navigation(format!("no such route {}", route)));
        }
        self.routes.lock().push(route.to_string());
        Ok(())
    }
}
