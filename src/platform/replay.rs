use super::{Capabilities, MotionPlatform, PermissionState};
use crate::error::{ReplayError, Result, SensorError};
use crate::sample::MotionSample;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Plays back a recorded sample stream, paced by the recorded timestamps.
///
/// Recordings are JSON lines, one [`MotionSample`] per line. Blank lines and
/// lines starting with `#` are skipped.
pub struct ReplayPlatform {
    samples: Arc<Vec<MotionSample>>,
    speed: f64,
    cancellation_token: Mutex<Option<CancellationToken>>,
}

impl ReplayPlatform {
    pub fn from_samples(samples: Vec<MotionSample>) -> Self {
        Self {
            samples: Arc::new(samples),
            speed: 1.0,
            cancellation_token: Mutex::new(None),
        }
    }

    /// Load a JSON-lines recording
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let samples = Self::parse(&content)?;
        info!(
            "Loaded {} recorded samples from {}",
            samples.len(),
            path.as_ref().display()
        );
        Ok(Self::from_samples(samples))
    }

    pub fn parse(content: &str) -> std::result::Result<Vec<MotionSample>, ReplayError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| ReplayError::Parse {
                    line: index + 1,
                    details: e.to_string(),
                })
            })
            .collect()
    }

    /// Playback speed factor; 2.0 plays twice as fast
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        } else {
            warn!("Ignoring invalid replay speed {}", speed);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    async fn play(
        samples: Arc<Vec<MotionSample>>,
        speed: f64,
        sink: mpsc::Sender<MotionSample>,
        token: CancellationToken,
    ) {
        let mut previous: Option<u64> = None;

        for sample in samples.iter() {
            if let Some(prev) = previous {
                let gap = sample.timestamp.saturating_sub(prev) as f64 / speed;
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(gap as u64)) => {}
                }
            }
            previous = Some(sample.timestamp);

            if token.is_cancelled() || sink.send(*sample).await.is_err() {
                break;
            }
        }

        debug!("Replay finished");
    }
}

#[async_trait]
impl MotionPlatform for ReplayPlatform {
    fn name(&self) -> &str {
        "replay"
    }

    fn capabilities(&self) -> Capabilities {
        if self.samples.is_empty() {
            Capabilities::NONE
        } else {
            Capabilities::FULL
        }
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn open_stream(&self, sink: mpsc::Sender<MotionSample>) -> std::result::Result<(), SensorError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| SensorError::StreamOpen {
            details: e.to_string(),
        })?;

        let token = CancellationToken::new();
        if let Some(previous) = self.cancellation_token.lock().replace(token.clone()) {
            previous.cancel();
        }

        info!("Replaying {} samples at {}x", self.samples.len(), self.speed);
        handle.spawn(Self::play(Arc::clone(&self.samples), self.speed, sink, token));
        Ok(())
    }

    fn close_stream(&self) {
        if let Some(token) = self.cancellation_token.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::time::timeout;

    const RECORDING: &str = r#"# shake then tilt
{"timestamp":0,"ax":0.0,"ay":0.0,"az":9.8}

{"timestamp":20,"ax":20.0,"ay":20.0,"az":20.0}
{"timestamp":40,"ax":0.0,"ay":0.0,"az":9.8,"beta":60.0,"gamma":0.0}
"#;

    #[test]
    fn test_parse_recording() {
        let samples = ReplayPlatform::parse(RECORDING).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].beta, Some(60.0));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = ReplayPlatform::parse("{\"timestamp\":0,\"ax\":0,\"ay\":0,\"az\":0}\nnot json")
            .unwrap_err();
        match err {
            ReplayError::Parse { line, .. } => assert_eq!(line, 2),
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RECORDING.as_bytes()).unwrap();

        let platform = ReplayPlatform::from_file(file.path()).unwrap();
        assert_eq!(platform.len(), 3);
        assert!(platform.capabilities().supported());
    }

    #[test]
    fn test_empty_recording_is_unsupported() {
        let platform = ReplayPlatform::from_samples(Vec::new());
        assert!(!platform.capabilities().supported());
    }

    #[tokio::test]
    async fn test_replay_streams_samples_in_order() {
        let samples = ReplayPlatform::parse(RECORDING).unwrap();
        let platform = ReplayPlatform::from_samples(samples).with_speed(10.0);
        let (tx, mut rx) = mpsc::channel(8);

        platform.open_stream(tx).unwrap();

        let mut timestamps = Vec::new();
        for _ in 0..3 {
            let sample = timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            timestamps.push(sample.timestamp);
        }
        assert_eq!(timestamps, vec![0, 20, 40]);
        platform.close_stream();
    }
}
