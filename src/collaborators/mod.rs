//! Side-effect interfaces the engine calls into but does not implement.
//!
//! Haptics is async and best-effort. Notifications and navigation are
//! fire-and-forget. Every call may fail; the dispatcher logs and skips a
//! failed call without affecting the others.

mod console;
mod mock;

pub use console::{ConsoleHaptics, ConsoleNavigator, ConsoleNotifier};
pub use mock::{Notice, RecordingHaptics, RecordingNavigator, RecordingNotifier};

use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Vibration strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticPattern {
    Standard,
    /// Softer pulse used for step milestones
    Gentle,
}

/// Toast style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeOptions {
    pub description: Option<String>,
    pub duration_ms: Option<u64>,
}

impl NoticeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait Haptics: Send + Sync {
    async fn vibrate(&self, pattern: HapticPattern) -> Result<(), CollaboratorError>;
}

pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        options: NoticeOptions,
    ) -> Result<(), CollaboratorError>;
}

pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str) -> Result<(), CollaboratorError>;
}
