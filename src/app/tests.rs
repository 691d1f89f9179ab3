use super::*;
use crate::collaborators::{NoticeKind, RecordingHaptics, RecordingNavigator, RecordingNotifier};
use crate::config::FitmotionConfig;
use crate::desktop::KeyAction;
use crate::dispatcher::{Collaborators, InputSource};
use crate::error::FitmotionError;
use crate::events::{GestureEvent, SensorStatus};
use crate::messages;
use crate::picker::Picker;
use crate::platform::{MockMotionPlatform, MotionPlatform, PermissionState, ReplayPlatform, UnsupportedPlatform};
use crate::sample::MotionSample;
use crossterm::event::KeyCode;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};

struct Fixture {
    engine: GestureEngine,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

fn fixture(platform: Arc<dyn MotionPlatform>) -> Fixture {
    fixture_with(platform, FitmotionConfig::default(), false)
}

fn fixture_with(platform: Arc<dyn MotionPlatform>, config: FitmotionConfig, force_desktop: bool) -> Fixture {
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let collaborators = Collaborators::new(
        Arc::new(RecordingHaptics::new()),
        notifier.clone(),
        navigator.clone(),
    );

    let engine = GestureEngine::builder()
        .config(config)
        .platform(platform)
        .collaborators(collaborators)
        .picker(Picker::new(11))
        .force_desktop(force_desktop)
        .interactive(false)
        .build()
        .unwrap();

    Fixture {
        engine,
        notifier,
        navigator,
    }
}

fn shake_notices(notifier: &RecordingNotifier) -> usize {
    notifier
        .notices()
        .iter()
        .filter(|n| n.options.description.as_deref() == Some(messages::SHAKE_DESCRIPTION))
        .count()
}

#[test]
fn test_builder_requires_platform_and_collaborators() {
    let result = GestureEngine::builder().build();
    assert!(matches!(result, Err(FitmotionError::Component { .. })));

    let result = GestureEngine::builder()
        .platform(Arc::new(UnsupportedPlatform))
        .build();
    assert!(matches!(result, Err(FitmotionError::Component { .. })));
}

#[test]
fn test_builder_validates_config() {
    let mut config = FitmotionConfig::default();
    config.actions.routes.clear();

    let result = GestureEngine::builder()
        .config(config)
        .platform(Arc::new(UnsupportedPlatform))
        .build();
    assert!(matches!(result, Err(FitmotionError::Config(_))));
}

#[tokio::test]
async fn test_start_with_sensors() {
    let platform = Arc::new(MockMotionPlatform::new());
    let mut f = fixture(platform.clone());

    f.engine.initialize().await.unwrap();
    assert_eq!(f.engine.start().await.unwrap(), InputSource::Sensors);

    assert_eq!(f.engine.dispatcher().running_tasks(), 3);
    assert!(platform.is_streaming());
    assert_eq!(
        f.engine.get_component_state("sampler").await,
        Some(ComponentState::Running)
    );
    assert_eq!(
        f.notifier.messages(),
        vec!["Shake & tilt your device for features!".to_string()]
    );

    platform.push(MotionSample::acceleration(1000, 0.0, 0.0, 0.0));
    platform.push(MotionSample::acceleration(1100, 20.0, 20.0, 20.0));
    for _ in 0..100 {
        if f.navigator.count() == 1 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(f.navigator.count(), 1);
    assert!(f.engine.dispatcher().last_shake_action().is_some());
}

#[tokio::test]
async fn test_unsupported_platform_falls_back_to_desktop() {
    let mut f = fixture(Arc::new(UnsupportedPlatform));

    f.engine.initialize().await.unwrap();
    assert_eq!(f.engine.start().await.unwrap(), InputSource::Desktop);
    assert_eq!(f.engine.sampler().status(), SensorStatus::Unsupported);

    let notices = f.notifier.notices();
    assert_eq!(notices[0].kind, NoticeKind::Warning);
    assert_eq!(
        f.engine.get_component_state("desktop").await,
        Some(ComponentState::Running)
    );
    f.notifier.clear();

    // One press, one gesture
    assert_eq!(
        f.engine.simulate_key(KeyCode::Char('s')),
        Some(KeyAction::Gesture(GestureEvent::Shake))
    );
    assert_eq!(shake_notices(&f.notifier), 1);
    assert_eq!(f.navigator.count(), 1);

    f.engine.simulate_key(KeyCode::Char('s'));
    assert_eq!(shake_notices(&f.notifier), 2);
}

#[tokio::test]
async fn test_desktop_keys_follow_toggles() {
    let mut f = fixture(Arc::new(UnsupportedPlatform));
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();
    f.notifier.clear();

    assert!(!f.engine.toggle_shake_detection().await);
    assert_eq!(f.notifier.messages(), vec!["Shake detection disabled".to_string()]);

    f.engine.simulate_key(KeyCode::Char('s'));
    assert_eq!(shake_notices(&f.notifier), 0);
    assert_eq!(f.navigator.count(), 0);

    assert!(f.engine.toggle_shake_detection().await);
    f.engine.simulate_key(KeyCode::Char('s'));
    assert_eq!(shake_notices(&f.notifier), 1);
}

#[tokio::test]
async fn test_permission_denied_keeps_detection_disabled() {
    let platform = Arc::new(MockMotionPlatform::gated(PermissionState::Denied));
    let mut f = fixture(platform.clone());

    f.engine.initialize().await.unwrap();
    assert_eq!(f.engine.start().await.unwrap(), InputSource::Inactive);

    let dispatcher = f.engine.dispatcher();
    assert!(!dispatcher.is_shake_enabled());
    assert!(!dispatcher.is_tilt_enabled());
    assert_eq!(platform.open_count(), 0);
    assert_eq!(
        f.engine.get_component_state("sampler").await,
        Some(ComponentState::Failed)
    );

    // The warning is the only notice; no feature hint with everything off
    let notices = f.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Motion detection permission denied");
    assert_eq!(notices[0].kind, NoticeKind::Error);
}

#[tokio::test]
async fn test_toggle_after_denial_asks_again() {
    let platform = Arc::new(MockMotionPlatform::gated(PermissionState::Denied));
    let mut f = fixture(platform.clone());
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();
    f.notifier.clear();

    // Still refused: the detector stays off and the refusal is shown again
    assert!(!f.engine.toggle_shake_detection().await);
    assert_eq!(platform.permission_requests(), 2);
    assert!(!f.engine.dispatcher().is_shake_enabled());
    assert_eq!(f.engine.input_source(), InputSource::Inactive);
    assert_eq!(f.engine.dispatcher().running_tasks(), 0);
    assert!(!platform.is_streaming());
    assert_eq!(
        f.notifier.messages(),
        vec!["Motion detection permission denied".to_string()]
    );

    assert!(!f.engine.toggle_tilt_detection().await);
    assert_eq!(platform.permission_requests(), 3);
    assert!(!f.engine.dispatcher().is_tilt_enabled());
    assert!(!f.engine.dispatcher().is_step_enabled());
}

#[tokio::test]
async fn test_toggle_after_permission_granted_attaches_sensors() {
    let platform = Arc::new(MockMotionPlatform::gated(PermissionState::Denied));
    let mut f = fixture(platform.clone());
    f.engine.initialize().await.unwrap();
    assert_eq!(f.engine.start().await.unwrap(), InputSource::Inactive);
    f.notifier.clear();

    platform.set_permission(PermissionState::Granted);
    assert!(f.engine.toggle_shake_detection().await);

    assert_eq!(f.engine.input_source(), InputSource::Sensors);
    assert_eq!(f.engine.dispatcher().running_tasks(), 1);
    assert!(platform.is_streaming());
    assert_eq!(
        f.engine.get_component_state("sampler").await,
        Some(ComponentState::Running)
    );
    assert_eq!(f.notifier.messages(), vec!["Shake detection enabled!".to_string()]);

    // Turning it back off needs no further prompt
    assert!(!f.engine.toggle_shake_detection().await);
    assert_eq!(platform.permission_requests(), 2);
}

#[tokio::test]
async fn test_forced_desktop_ignores_sensors() {
    let platform = Arc::new(MockMotionPlatform::new());
    let mut f = fixture_with(platform.clone(), FitmotionConfig::default(), true);

    f.engine.initialize().await.unwrap();
    assert_eq!(f.engine.start().await.unwrap(), InputSource::Desktop);
    assert_eq!(platform.open_count(), 0);
    assert_eq!(f.engine.sampler().status(), SensorStatus::Idle);
}

#[tokio::test]
async fn test_tilt_toggle_announces_step_detection() {
    let mut f = fixture(Arc::new(MockMotionPlatform::new()));
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();
    f.notifier.clear();

    assert!(!f.engine.toggle_tilt_detection().await);
    assert!(f.engine.toggle_tilt_detection().await);
    assert_eq!(
        f.notifier.messages(),
        vec![
            "Tilt and step detection disabled".to_string(),
            "Tilt and step detection enabled!".to_string()
        ]
    );
    assert_eq!(f.engine.dispatcher().running_tasks(), 3);
}

#[tokio::test]
async fn test_replayed_recording_drives_detectors() {
    let samples = vec![
        MotionSample::acceleration(0, 0.0, 0.0, 9.8),
        MotionSample::acceleration(100, 20.0, 20.0, 20.0),
        MotionSample::orientation(200, 70.0, 0.0),
    ];
    let platform = Arc::new(ReplayPlatform::from_samples(samples).with_speed(10.0));
    let mut config = FitmotionConfig::default();
    config.sampler.min_interval_ms = 50;
    let mut f = fixture_with(platform, config, false);

    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();

    let quote_shown = || {
        f.notifier
            .notices()
            .iter()
            .any(|n| messages::HEALTH_QUOTES.contains(&n.message.as_str()))
    };
    for _ in 0..100 {
        if f.navigator.count() == 1 && quote_shown() {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(f.navigator.count(), 1);
    assert!(quote_shown());

    sleep(Duration::from_millis(20)).await;
    let metrics = f.engine.metrics();
    assert_eq!(metrics.gesture_count("shake"), 1);
}

#[tokio::test]
async fn test_run_until_shutdown_requested() {
    let platform = Arc::new(MockMotionPlatform::new());
    let mut f = fixture(platform.clone());
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();

    let event_bus = f.engine.event_bus();
    let sampler = Arc::clone(f.engine.sampler());
    let mut engine = f.engine;
    let handle = tokio::spawn(async move { engine.run().await });

    sleep(Duration::from_millis(50)).await;
    event_bus
        .publish(crate::events::MotionEvent::ShutdownRequested {
            timestamp: std::time::SystemTime::now(),
            reason: "test".to_string(),
        })
        .unwrap();

    let exit_code = timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(sampler.status(), SensorStatus::Stopped);
    assert!(!platform.is_streaming());
}

#[tokio::test]
async fn test_shutdown_stops_components() {
    let mut f = fixture(Arc::new(UnsupportedPlatform));
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();

    assert_eq!(f.engine.shutdown().await.unwrap(), 0);

    let states = f.engine.get_all_component_states().await;
    assert!(states.values().all(|s| *s == ComponentState::Stopped));
    assert_eq!(f.engine.input_source(), InputSource::Inactive);
    assert_eq!(f.engine.simulate_key(KeyCode::Char('s')), None);
}

#[tokio::test]
async fn test_metrics_count_bus_events() {
    let mut f = fixture(Arc::new(UnsupportedPlatform));
    f.engine.initialize().await.unwrap();
    f.engine.start().await.unwrap();

    f.engine.simulate_key(KeyCode::Char('t'));
    f.engine.simulate_key(KeyCode::Char('t'));
    sleep(Duration::from_millis(50)).await;

    let metrics = f.engine.metrics();
    assert_eq!(metrics.gesture_count("tilt"), 2);
    assert!(metrics.events_by_type.contains_key("sensor_status_changed"));
}
