//! Fixed message sets shown alongside gestures.

/// Shown on shake
pub const MOTIVATIONAL_MESSAGES: &[&str] = &[
    "Keep going! You're doing great on your fitness journey!",
    "Don't forget to track your calories today!",
    "A little progress each day adds up to big results!",
    "Stay hydrated and keep moving!",
    "Remember your fitness goals for today!",
];

/// Shown on tilt
pub const HEALTH_QUOTES: &[&str] = &[
    "The greatest wealth is health.",
    "Take care of your body. It's the only place you have to live.",
    "Healthy is an outfit that looks different on everybody.",
    "Health is not valued until sickness comes.",
    "An apple a day keeps the doctor away.",
    "Let food be thy medicine and medicine be thy food.",
    "Walking is man's best medicine.",
    "Health is a state of complete harmony of the body, mind, and spirit.",
];

/// Shown with step milestones
pub const STEP_ENCOURAGEMENTS: &[&str] = &[
    "Great job! Keep walking for better health.",
    "You're on your way to your 10,000 steps goal!",
    "Walking improves circulation and mood.",
    "Every step counts towards a healthier you!",
    "Walking regularly reduces risk of chronic diseases.",
];

pub const SHAKE_DESCRIPTION: &str = "Shake detected! Stay motivated!";
pub const TILT_DESCRIPTION: &str = "Health reminder";

pub fn step_headline(count: u64) -> String {
    format!("{} steps taken!", count)
}

/// Intro notice describing which gestures are live
pub fn feature_hint(shake_enabled: bool, tilt_enabled: bool) -> Option<&'static str> {
    match (shake_enabled, tilt_enabled) {
        (true, true) => Some("Shake & tilt your device for features!"),
        (true, false) => Some("Shake your device to navigate!"),
        (false, true) => Some("Tilt your device for health tips!"),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_hint() {
        assert_eq!(
            feature_hint(true, true),
            Some("Shake & tilt your device for features!")
        );
        assert_eq!(feature_hint(false, true), Some("Tilt your device for health tips!"));
        assert_eq!(feature_hint(false, false), None);
    }

    #[test]
    fn test_message_sets_are_populated() {
        assert_eq!(MOTIVATIONAL_MESSAGES.len(), 5);
        assert_eq!(HEALTH_QUOTES.len(), 8);
        assert_eq!(STEP_ENCOURAGEMENTS.len(), 5);
        assert_eq!(step_headline(30), "30 steps taken!");
    }
}
