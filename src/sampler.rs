//! Motion sampler.
//!
//! Bridges a [`MotionPlatform`] into a throttled broadcast of
//! [`MotionSample`]s. The platform stream is shared by every detector: it is
//! opened when the first [`SampleSubscription`] is taken and closed when the
//! last one is dropped.

use crate::config::SamplerConfig;
use crate::error::SensorError;
use crate::events::{EventBus, MotionEvent, SensorStatus};
use crate::platform::{MotionPlatform, PermissionState};
use crate::sample::MotionSample;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delivery gate: no two delivered samples closer than `min_interval_ms`.
///
/// Samples inside the window are dropped, not buffered. Samples older than
/// the last delivered one are dropped as well.
#[derive(Debug, Clone, Copy)]
pub struct SampleThrottle {
    min_interval_ms: u64,
    last_delivered: Option<u64>,
}

impl SampleThrottle {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_delivered: None,
        }
    }

    /// Returns true when the sample should be delivered
    pub fn admit(&mut self, timestamp: u64) -> bool {
        let admitted = match self.last_delivered {
            None => true,
            Some(last) if timestamp < last => false,
            Some(last) => timestamp - last >= self.min_interval_ms,
        };
        if admitted {
            self.last_delivered = Some(timestamp);
        }
        admitted
    }

    pub fn last_delivered(&self) -> Option<u64> {
        self.last_delivered
    }
}

/// Sampler counters
#[derive(Debug, Default)]
pub struct SamplerStats {
    pub samples_received: AtomicU64,
    pub samples_delivered: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub streams_opened: AtomicU64,
}

impl SamplerStats {
    pub fn snapshot(&self) -> SamplerStatsSnapshot {
        SamplerStatsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_delivered: self.samples_delivered.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerStatsSnapshot {
    pub samples_received: u64,
    pub samples_delivered: u64,
    pub samples_dropped: u64,
    pub streams_opened: u64,
}

struct SamplerInner {
    status: SensorStatus,
    subscribers: usize,
    /// Bumped on every start so stale subscriptions cannot touch a new session
    generation: u64,
    session: CancellationToken,
    stream: Option<CancellationToken>,
}

struct SamplerShared {
    platform: Arc<dyn MotionPlatform>,
    config: SamplerConfig,
    sender: broadcast::Sender<MotionSample>,
    inner: Mutex<SamplerInner>,
    stats: SamplerStats,
}

impl SamplerShared {
    fn open_stream(self: &Arc<Self>, inner: &mut SamplerInner) -> Result<(), SensorError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| SensorError::StreamOpen {
                details: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        self.platform.open_stream(tx)?;

        let token = CancellationToken::new();
        handle.spawn(Self::pump(Arc::clone(self), rx, token.clone()));
        inner.stream = Some(token);
        self.stats.streams_opened.fetch_add(1, Ordering::Relaxed);

        info!("Motion stream opened on {} platform", self.platform.name());
        Ok(())
    }

    fn close_stream(&self, inner: &mut SamplerInner) {
        if let Some(token) = inner.stream.take() {
            token.cancel();
            self.platform.close_stream();
            info!("Motion stream closed");
        }
    }

    fn release(&self, generation: u64, consumer: &str) {
        let mut inner = self.inner.lock();
        if inner.generation != generation || inner.subscribers == 0 {
            debug!("Stale sample subscription '{}' released", consumer);
            return;
        }

        inner.subscribers -= 1;
        debug!(
            "Sample subscription '{}' released ({} remaining)",
            consumer, inner.subscribers
        );

        if inner.subscribers == 0 {
            self.close_stream(&mut inner);
        }
    }

    async fn pump(
        shared: Arc<SamplerShared>,
        mut rx: mpsc::Receiver<MotionSample>,
        token: CancellationToken,
    ) {
        let mut throttle = SampleThrottle::new(shared.config.min_interval_ms);

        loop {
            let sample = tokio::select! {
                _ = token.cancelled() => break,
                sample = rx.recv() => match sample {
                    Some(sample) => sample,
                    None => {
                        debug!("Platform closed the sample channel");
                        break;
                    }
                },
            };

            shared.stats.samples_received.fetch_add(1, Ordering::Relaxed);

            if !throttle.admit(sample.timestamp) {
                shared.stats.samples_dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            // No receivers is fine; subscriptions may be between tasks
            if shared.sender.send(sample).is_ok() {
                shared.stats.samples_delivered.fetch_add(1, Ordering::Relaxed);
            }
        }

        debug!("Sample pump exited");
    }
}

/// Rate-limited fan-out of platform motion samples
pub struct MotionSampler {
    shared: Arc<SamplerShared>,
    event_bus: Arc<EventBus>,
}

impl MotionSampler {
    pub fn new(
        platform: Arc<dyn MotionPlatform>,
        config: SamplerConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            shared: Arc::new(SamplerShared {
                platform,
                config,
                sender,
                inner: Mutex::new(SamplerInner {
                    status: SensorStatus::Idle,
                    subscribers: 0,
                    generation: 0,
                    session: CancellationToken::new(),
                    stream: None,
                }),
                stats: SamplerStats::default(),
            }),
            event_bus,
        }
    }

    /// Check the platform and request permission where it is gated.
    ///
    /// Does not open the platform stream; that happens on first subscribe.
    /// Calling `start` on a ready sampler is a no-op.
    pub async fn start(&self) -> Result<SensorStatus, SensorError> {
        if self.status() == SensorStatus::Ready {
            return Ok(SensorStatus::Ready);
        }

        let platform = &self.shared.platform;
        let capabilities = platform.capabilities();
        info!(
            "Starting motion sampler on {} platform ({:?})",
            platform.name(),
            capabilities
        );

        if !capabilities.supported() {
            self.set_status(SensorStatus::Unsupported);
            return Err(SensorError::Unsupported);
        }

        if capabilities.requires_permission {
            debug!("Requesting motion permission");
            if platform.request_permission().await == PermissionState::Denied {
                self.set_status(SensorStatus::PermissionDenied);
                return Err(SensorError::PermissionDenied);
            }
        }

        {
            let mut inner = self.shared.inner.lock();
            inner.generation += 1;
            inner.session = CancellationToken::new();
            inner.subscribers = 0;
        }
        self.set_status(SensorStatus::Ready);
        Ok(SensorStatus::Ready)
    }

    /// Register a consumer of throttled samples
    pub fn subscribe(&self, consumer: &str) -> Result<SampleSubscription, SensorError> {
        let mut inner = self.shared.inner.lock();

        match inner.status {
            SensorStatus::Ready => {}
            SensorStatus::Idle => return Err(SensorError::NotStarted),
            SensorStatus::PermissionDenied => return Err(SensorError::PermissionDenied),
            SensorStatus::Unsupported => return Err(SensorError::Unsupported),
            SensorStatus::Stopped => return Err(SensorError::Stopped),
        }

        let receiver = self.shared.sender.subscribe();

        if inner.subscribers == 0 {
            self.shared.open_stream(&mut inner)?;
        }
        inner.subscribers += 1;

        debug!(
            "Sample subscription '{}' added ({} active)",
            consumer, inner.subscribers
        );

        Ok(SampleSubscription {
            receiver,
            session: inner.session.clone(),
            guard: SubscriptionGuard {
                shared: Arc::clone(&self.shared),
                generation: inner.generation,
                consumer: consumer.to_string(),
            },
        })
    }

    /// Close the platform stream and end all subscriptions. Idempotent.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if matches!(inner.status, SensorStatus::Stopped | SensorStatus::Idle) {
                debug!("Motion sampler already stopped");
                return;
            }

            self.shared.close_stream(&mut inner);
            inner.session.cancel();
            inner.subscribers = 0;
            inner.generation += 1;
        }

        let stats = self.stats();
        info!(
            "Motion sampler stopped: {} received, {} delivered, {} dropped",
            stats.samples_received, stats.samples_delivered, stats.samples_dropped
        );
        self.set_status(SensorStatus::Stopped);
    }

    pub fn status(&self) -> SensorStatus {
        self.shared.inner.lock().status
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.inner.lock().subscribers
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.inner.lock().stream.is_some()
    }

    pub fn stats(&self) -> SamplerStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn platform_name(&self) -> &str {
        self.shared.platform.name()
    }

    fn set_status(&self, status: SensorStatus) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.status == status {
                return;
            }
            inner.status = status;
        }

        let event = MotionEvent::SensorStatusChanged {
            status,
            timestamp: SystemTime::now(),
        };
        if let Err(e) = self.event_bus.publish(event) {
            warn!("Failed to publish sensor status: {}", e);
        }
    }
}

struct SubscriptionGuard {
    shared: Arc<SamplerShared>,
    generation: u64,
    consumer: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.shared.release(self.generation, &self.consumer);
    }
}

/// A consumer's handle on the sample stream; dropping it unsubscribes
pub struct SampleSubscription {
    receiver: broadcast::Receiver<MotionSample>,
    session: CancellationToken,
    guard: SubscriptionGuard,
}

impl SampleSubscription {
    /// Next delivered sample, or `None` once the sampler is stopped
    pub async fn recv(&mut self) -> Option<MotionSample> {
        loop {
            tokio::select! {
                _ = self.session.cancelled() => return None,
                result = self.receiver.recv() => match result {
                    Ok(sample) => return Some(sample),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Subscription '{}' lagged behind by {} samples", self.guard.consumer, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn consumer(&self) -> &str {
        &self.guard.consumer
    }
}
