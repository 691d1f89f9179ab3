use super::*;
use crate::collaborators::{
    HapticPattern, NoticeKind, RecordingHaptics, RecordingNavigator, RecordingNotifier,
};
use crate::config::FitmotionConfig;
use crate::messages;
use crate::platform::MockMotionPlatform;
use crate::sample::MotionSample;
use tokio::time::{sleep, Duration};

struct Harness {
    platform: Arc<MockMotionPlatform>,
    sampler: Arc<MotionSampler>,
    haptics: Arc<RecordingHaptics>,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
    event_bus: Arc<EventBus>,
    dispatcher: GestureDispatcher,
}

async fn harness_with(config: FitmotionConfig) -> Harness {
    let platform = Arc::new(MockMotionPlatform::new());
    let event_bus = Arc::new(EventBus::new(64));
    let sampler = Arc::new(MotionSampler::new(
        Arc::clone(&platform) as Arc<dyn crate::platform::MotionPlatform>,
        config.sampler.clone(),
        Arc::clone(&event_bus),
    ));
    sampler.start().await.unwrap();

    let haptics = Arc::new(RecordingHaptics::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let collaborators = Collaborators::new(
        haptics.clone(),
        notifier.clone(),
        navigator.clone(),
    );

    let dispatcher = GestureDispatcher::new(
        &config,
        Arc::clone(&sampler),
        collaborators,
        Picker::new(7),
        Arc::clone(&event_bus),
    );

    Harness {
        platform,
        sampler,
        haptics,
        notifier,
        navigator,
        event_bus,
        dispatcher,
    }
}

async fn harness() -> Harness {
    harness_with(FitmotionConfig::default()).await
}

/// Let spawned detector and haptics tasks run
async fn settle() {
    tokio::task::yield_now().await;
    sleep(Duration::from_millis(50)).await;
}

async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}

fn push_shake(platform: &MockMotionPlatform, start: u64) {
    platform.push(MotionSample::acceleration(start, 0.0, 0.0, 0.0));
    platform.push(MotionSample::acceleration(start + 100, 20.0, 20.0, 20.0));
}

#[tokio::test]
async fn test_shake_runs_all_side_effects() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    push_shake(&h.platform, 1000);
    assert!(wait_until(|| h.navigator.count() == 1).await);
    settle().await;

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Info);
    assert!(messages::MOTIVATIONAL_MESSAGES.contains(&notices[0].message.as_str()));
    assert_eq!(
        notices[0].options.description.as_deref(),
        Some(messages::SHAKE_DESCRIPTION)
    );
    assert_eq!(notices[0].options.duration_ms, Some(5000));

    let route = &h.navigator.routes()[0];
    assert!(FitmotionConfig::default().actions.routes.contains(route));
    assert_eq!(h.haptics.calls(), vec![HapticPattern::Standard]);
    assert!(h.dispatcher.last_shake_action().is_some());
}

#[tokio::test]
async fn test_disabled_shake_produces_no_side_effects() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    assert!(!h.dispatcher.toggle_shake_detection());
    push_shake(&h.platform, 1000);
    push_shake(&h.platform, 2000);
    settle().await;

    assert_eq!(h.haptics.call_count(), 0);
    assert_eq!(h.notifier.count(), 0);
    assert_eq!(h.navigator.count(), 0);
    assert!(h.dispatcher.last_shake_action().is_none());
}

#[tokio::test]
async fn test_reenabled_shake_fires_again() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    h.dispatcher.toggle_shake_detection();
    push_shake(&h.platform, 1000);
    settle().await;
    assert_eq!(h.navigator.count(), 0);

    assert!(h.dispatcher.toggle_shake_detection());
    settle().await;
    push_shake(&h.platform, 3000);
    assert!(wait_until(|| h.navigator.count() == 1).await);
}

#[tokio::test]
async fn test_collaborator_failures_do_not_block_other_effects() {
    let h = harness().await;
    h.haptics.set_failing(true);
    h.navigator.set_failing(true);
    let mut events = h.event_bus.subscribe();

    assert!(h.dispatcher.handle_gesture(GestureEvent::Shake));
    settle().await;

    assert_eq!(h.notifier.count(), 1);
    assert_eq!(h.haptics.call_count(), 1);
    assert!(h.dispatcher.last_shake_action().is_some());
    assert!(h.dispatcher.is_shake_enabled());

    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let MotionEvent::CollaboratorFailed { collaborator, .. } = event {
            failed.push(collaborator);
        }
    }
    failed.sort();
    assert_eq!(failed, vec!["haptics".to_string(), "navigation".to_string()]);
}

#[tokio::test]
async fn test_failing_notifier_still_navigates() {
    let h = harness().await;
    h.notifier.set_failing(true);

    h.dispatcher.handle_gesture(GestureEvent::Shake);
    assert_eq!(h.navigator.count(), 1);
}

#[tokio::test]
async fn test_tilt_shows_health_quote_without_navigation() {
    let h = harness().await;

    assert!(h.dispatcher.handle_gesture(GestureEvent::Tilt));
    settle().await;

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(messages::HEALTH_QUOTES.contains(&notices[0].message.as_str()));
    assert_eq!(notices[0].options.description.as_deref(), Some("Health reminder"));
    assert_eq!(notices[0].options.duration_ms, Some(4000));
    assert_eq!(h.navigator.count(), 0);
    assert_eq!(h.haptics.calls(), vec![HapticPattern::Standard]);
}

#[tokio::test]
async fn test_step_milestone_notice() {
    let h = harness().await;

    h.dispatcher.handle_gesture(GestureEvent::Step { count: 20 });
    settle().await;

    let notices = h.notifier.notices();
    assert_eq!(notices[0].message, "20 steps taken!");
    assert_eq!(notices[0].kind, NoticeKind::Success);
    let description = notices[0].options.description.clone().unwrap();
    assert!(messages::STEP_ENCOURAGEMENTS.contains(&description.as_str()));
    assert_eq!(h.haptics.calls(), vec![HapticPattern::Gentle]);
}

#[tokio::test]
async fn test_gestures_are_broadcast() {
    let h = harness().await;
    let mut events = h.event_bus.subscribe();

    h.dispatcher.handle_gesture(GestureEvent::Tilt);

    match events.recv().await.unwrap() {
        MotionEvent::GestureDetected {
            gesture, message, ..
        } => {
            assert_eq!(gesture, GestureEvent::Tilt);
            assert_eq!(h.notifier.messages(), vec![message.unwrap()]);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_handle_gesture_respects_flags() {
    let h = harness().await;

    h.dispatcher.toggle_shake_detection();
    h.dispatcher.toggle_tilt_detection();

    assert!(!h.dispatcher.handle_gesture(GestureEvent::Shake));
    assert!(!h.dispatcher.handle_gesture(GestureEvent::Tilt));
    assert!(!h.dispatcher.handle_gesture(GestureEvent::Step { count: 10 }));
    settle().await;

    assert_eq!(h.notifier.count(), 0);
    assert_eq!(h.haptics.call_count(), 0);
}

#[tokio::test]
async fn test_tilt_toggle_drives_step_detection() {
    let h = harness().await;
    let mut events = h.event_bus.subscribe();

    assert!(h.dispatcher.is_step_enabled());
    assert!(!h.dispatcher.toggle_tilt_detection());
    assert!(!h.dispatcher.is_tilt_enabled());
    assert!(!h.dispatcher.is_step_enabled());

    match events.recv().await.unwrap() {
        MotionEvent::DetectionToggled {
            detector, enabled, ..
        } => {
            assert_eq!(detector, DetectorKind::Tilt);
            assert!(!enabled);
        }
        other => panic!("Unexpected event: {:?}", other),
    }

    assert!(h.dispatcher.toggle_tilt_detection());
    assert!(h.dispatcher.is_step_enabled());
}

#[tokio::test]
async fn test_set_shake_threshold_clamps_and_rejects() {
    let h = harness().await;

    assert_eq!(h.dispatcher.set_shake_threshold(12.0).unwrap(), 12.0);
    assert_eq!(h.dispatcher.shake_threshold(), 12.0);
    assert_eq!(h.dispatcher.set_shake_threshold(100.0).unwrap(), 25.0);
    assert_eq!(h.dispatcher.set_shake_threshold(1.0).unwrap(), 5.0);

    assert!(matches!(
        h.dispatcher.set_shake_threshold(f64::NAN),
        Err(FitmotionError::InvalidThreshold { .. })
    ));
    assert_eq!(h.dispatcher.shake_threshold(), 5.0);
}

#[tokio::test]
async fn test_threshold_change_applies_without_restart() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();
    h.dispatcher.set_shake_threshold(12.0).unwrap();

    // speed = 0.1 / 100ms * 10000 = 10
    h.platform.push(MotionSample::acceleration(1000, 0.0, 0.0, 0.0));
    h.platform.push(MotionSample::acceleration(1100, 0.1, 0.0, 0.0));
    settle().await;
    assert_eq!(h.navigator.count(), 0);

    h.dispatcher.set_shake_threshold(8.0).unwrap();
    h.platform.push(MotionSample::acceleration(1200, 0.2, 0.0, 0.0));
    assert!(wait_until(|| h.navigator.count() == 1).await);
}

#[tokio::test]
async fn test_platform_stream_is_shared_between_detectors() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    assert_eq!(h.dispatcher.running_tasks(), 3);
    assert_eq!(h.sampler.subscriber_count(), 3);
    assert_eq!(h.platform.open_count(), 1);

    h.dispatcher.toggle_shake_detection();
    assert!(wait_until(|| h.sampler.subscriber_count() == 2).await);
    assert!(h.platform.is_streaming());

    h.dispatcher.toggle_tilt_detection();
    assert!(wait_until(|| h.sampler.subscriber_count() == 0).await);
    assert!(!h.platform.is_streaming());
    assert_eq!(h.dispatcher.running_tasks(), 0);
}

#[tokio::test]
async fn test_steps_counted_from_samples() {
    let mut config = FitmotionConfig::default();
    config.shake.enabled = false;
    let h = harness_with(config).await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    let levels = [12.0, 12.5, 0.0, 0.5, 12.0, 12.5];
    for (i, level) in levels.iter().enumerate() {
        h.platform
            .push(MotionSample::acceleration(1000 + i as u64 * 100, *level, 0.0, 0.0));
    }

    assert!(wait_until(|| h.dispatcher.step_count() == 3).await);
    // Below the first milestone nothing is announced
    assert_eq!(h.notifier.count(), 0);

    // The count survives a disable/enable cycle
    h.dispatcher.toggle_tilt_detection();
    h.dispatcher.toggle_tilt_detection();
    assert_eq!(h.dispatcher.step_count(), 3);
}

#[tokio::test]
async fn test_tilting_a_resting_device_is_not_a_shake() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    // Resting readings interleaved with small orientation changes; the first
    // reading at t=0 has no elapsed time and only seeds the detectors
    for i in 0..6u64 {
        let t = i * 200;
        h.platform.push(MotionSample::acceleration(t, 0.0, 0.0, 9.8));
        h.platform.push(MotionSample::orientation(t + 100, 10.0, 5.0));
    }
    settle().await;

    assert_eq!(h.sampler.stats().samples_delivered, 12);
    assert_eq!(h.notifier.count(), 0);
    assert_eq!(h.navigator.count(), 0);
    assert_eq!(h.haptics.call_count(), 0);
    assert_eq!(h.dispatcher.step_count(), 0);
    assert!(h.dispatcher.last_shake_action().is_none());

    // A real tilt produces a health quote and nothing else
    h.platform.push(MotionSample::orientation(2000, 60.0, 0.0));
    assert!(wait_until(|| h.notifier.count() == 1).await);
    settle().await;

    let notices = h.notifier.notices();
    assert!(messages::HEALTH_QUOTES.contains(&notices[0].message.as_str()));
    assert_eq!(h.navigator.count(), 0);
}

#[tokio::test]
async fn test_desktop_source_runs_no_tasks() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Desktop).unwrap();

    assert_eq!(h.dispatcher.running_tasks(), 0);
    assert!(!h.platform.is_streaming());

    h.dispatcher.toggle_shake_detection();
    h.dispatcher.toggle_shake_detection();
    assert_eq!(h.dispatcher.running_tasks(), 0);
}

#[tokio::test]
async fn test_toggle_on_fails_when_sampler_stopped() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();
    h.dispatcher.toggle_shake_detection();
    h.sampler.stop();

    assert!(!h.dispatcher.toggle_shake_detection());
    assert!(!h.dispatcher.is_shake_enabled());
}

#[tokio::test]
async fn test_disable_all_and_shutdown() {
    let h = harness().await;
    h.dispatcher.set_input_source(InputSource::Sensors).unwrap();

    h.dispatcher.disable_all();
    assert!(!h.dispatcher.is_shake_enabled());
    assert!(!h.dispatcher.is_tilt_enabled());
    assert!(!h.dispatcher.is_step_enabled());

    h.dispatcher.shutdown();
    assert_eq!(h.dispatcher.input_source(), InputSource::Inactive);
}

#[test]
fn test_toggle_notice_texts() {
    assert_eq!(
        announce::toggle_notice(DetectorKind::Shake, true),
        ("Shake detection enabled!", crate::collaborators::NoticeKind::Success)
    );
    assert_eq!(
        announce::toggle_notice(DetectorKind::Tilt, false).0,
        "Tilt and step detection disabled"
    );
}
