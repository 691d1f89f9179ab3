pub mod app;
pub mod collaborators;
pub mod config;
pub mod desktop;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod messages;
pub mod picker;
pub mod platform;
pub mod sample;
pub mod sampler;

pub use app::{ComponentState, GestureEngine, GestureEngineBuilder, ShutdownReason};
pub use collaborators::{
    ConsoleHaptics, ConsoleNavigator, ConsoleNotifier, HapticPattern, Haptics, Navigator,
    NoticeKind, NoticeOptions, Notifier,
};
pub use config::FitmotionConfig;
pub use desktop::{DesktopSimulator, KeyAction, KeyMap};
pub use detector::{
    DetectorConfig, GestureDetector, ShakeDetector, StepDetector, TiltDetector,
};
pub use dispatcher::{Collaborators, GestureActions, GestureDispatcher, InputSource};
pub use error::{FitmotionError, Result, SensorError};
pub use events::{
    DetectorKind, EventBus, EventFilter, EventMetrics, EventReceiver, GestureEvent, MotionEvent,
    SensorStatus,
};
pub use platform::{
    Capabilities, MockMotionPlatform, MotionPlatform, PermissionState, ReplayPlatform,
    UnsupportedPlatform,
};
pub use sample::{Axes, MotionSample};
pub use sampler::{MotionSampler, SampleSubscription};
