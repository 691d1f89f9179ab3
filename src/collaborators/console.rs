use super::{HapticPattern, Haptics, Navigator, NoticeKind, NoticeOptions, Notifier};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::Write;
use tracing::{debug, info};

/// Rings the terminal bell in place of a vibration motor
#[derive(Debug, Default)]
pub struct ConsoleHaptics;

#[async_trait]
impl Haptics for ConsoleHaptics {
    async fn vibrate(&self, pattern: HapticPattern) -> Result<(), CollaboratorError> {
        let marker = match pattern {
            HapticPattern::Standard => "\x07[bzzt]",
            HapticPattern::Gentle => "\x07[bz]",
        };
        let mut stdout = std::io::stdout();
        write!(stdout, "{}\r\n", marker)
            .and_then(|_| stdout.flush())
            .map_err(|e| CollaboratorError::Haptics(e.to_string()))
    }
}

/// Prints notices to stdout.
///
/// Lines end in `\r\n` since the desktop simulator keeps the terminal in raw
/// mode.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        options: NoticeOptions,
    ) -> Result<(), CollaboratorError> {
        let mut line = format!("[{}] {}", kind.as_str(), message);
        if let Some(description) = &options.description {
            line.push_str(" - ");
            line.push_str(description);
        }

        let mut stdout = std::io::stdout();
        write!(stdout, "{}\r\n", line)
            .and_then(|_| stdout.flush())
            .map_err(|e| CollaboratorError::Notification(e.to_string()))?;

        debug!("Notice shown for {:?} ms", options.duration_ms);
        Ok(())
    }
}

/// Tracks the current route and prints every navigation
#[derive(Debug)]
pub struct ConsoleNavigator {
    current: RwLock<String>,
}

impl ConsoleNavigator {
    pub fn new<S: Into<String>>(initial: S) -> Self {
        Self {
            current: RwLock::new(initial.into()),
        }
    }

    pub fn current_route(&self) -> String {
        self.current.read().clone()
    }
}

impl Default for ConsoleNavigator {
    fn default() -> Self {
        Self::new("/home")
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate_to(&self, route: &str) -> Result<(), CollaboratorError> {
        let previous = std::mem::replace(&mut *self.current.write(), route.to_string());
        info!("Navigating from {} to {}", previous, route);

        let mut stdout = std::io::stdout();
        write!(stdout, "-> {}\r\n", route)
            .and_then(|_| stdout.flush())
            .map_err(|e| CollaboratorError::Navigation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_navigator_tracks_route() {
        let navigator = ConsoleNavigator::default();
        assert_eq!(navigator.current_route(), "/home");

        navigator.navigate_to("/recipes").unwrap();
        assert_eq!(navigator.current_route(), "/recipes");
    }

    #[tokio::test]
    async fn test_console_collaborators_succeed() {
        assert!(ConsoleHaptics.vibrate(HapticPattern::Gentle).await.is_ok());
        assert!(ConsoleNotifier
            .notify(
                "Stay hydrated and keep moving!",
                NoticeKind::Info,
                NoticeOptions::new().description("Shake detected! Stay motivated!"),
            )
            .is_ok());
    }
}
