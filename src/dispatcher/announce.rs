//! User-facing notices for toggles and sensor problems.
//!
//! Kept apart from the dispatcher so that toggling never has to go through a
//! notification sink; callers decide whether to announce.

use crate::collaborators::{NoticeKind, NoticeOptions, Notifier};
use crate::error::SensorError;
use crate::events::DetectorKind;
use tracing::warn;

/// Confirmation text for a toggle
pub fn toggle_notice(detector: DetectorKind, enabled: bool) -> (&'static str, NoticeKind) {
    match (detector, enabled) {
        (DetectorKind::Shake, true) => ("Shake detection enabled!", NoticeKind::Success),
        (DetectorKind::Shake, false) => ("Shake detection disabled", NoticeKind::Info),
        (_, true) => ("Tilt and step detection enabled!", NoticeKind::Success),
        (_, false) => ("Tilt and step detection disabled", NoticeKind::Info),
    }
}

pub fn announce_toggle(notifier: &dyn Notifier, detector: DetectorKind, enabled: bool) {
    let (message, kind) = toggle_notice(detector, enabled);
    if let Err(e) = notifier.notify(message, kind, NoticeOptions::default()) {
        warn!("Failed to announce toggle: {}", e);
    }
}

/// One-shot notice for a sensor failure at startup
pub fn announce_sensor_error(notifier: &dyn Notifier, error: &SensorError) {
    let kind = match error {
        SensorError::PermissionDenied => NoticeKind::Error,
        _ => NoticeKind::Warning,
    };
    if let Err(e) = notifier.notify(&error.user_message(), kind, NoticeOptions::default()) {
        warn!("Failed to announce sensor error: {}", e);
    }
}

pub fn announce_hint(notifier: &dyn Notifier, hint: &str) {
    if let Err(e) = notifier.notify(hint, NoticeKind::Info, NoticeOptions::new().duration_ms(5000)) {
        warn!("Failed to show feature hint: {}", e);
    }
}
