use serde::{Deserialize, Serialize};

/// Three-axis acceleration reading in m/s²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub const ZERO: Axes = Axes {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sum(&self) -> f64 {
        self.x + self.y + self.z
    }

    /// Euclidean length of the per-axis difference to `other`
    pub fn delta_magnitude(&self, other: &Axes) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One normalized reading from the platform motion and orientation streams.
///
/// Orientation angles are in degrees and are absent when the platform
/// reported only acceleration for this tick; likewise the axes are absent
/// when it reported only orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Milliseconds on the platform clock
    pub timestamp: u64,
    /// Acceleration including gravity, absent on orientation-only ticks
    #[serde(default)]
    pub ax: Option<f64>,
    #[serde(default)]
    pub ay: Option<f64>,
    #[serde(default)]
    pub az: Option<f64>,
    /// Acceleration without gravity, when the platform provides it
    #[serde(default)]
    pub linear: Option<Axes>,
    /// Front-back tilt
    #[serde(default)]
    pub beta: Option<f64>,
    /// Left-right tilt
    #[serde(default)]
    pub gamma: Option<f64>,
    /// Compass heading
    #[serde(default)]
    pub alpha: Option<f64>,
}

impl MotionSample {
    /// Acceleration-only sample
    pub fn acceleration(timestamp: u64, ax: f64, ay: f64, az: f64) -> Self {
        Self {
            timestamp,
            ax: Some(ax),
            ay: Some(ay),
            az: Some(az),
            linear: None,
            beta: None,
            gamma: None,
            alpha: None,
        }
    }

    /// Orientation-only sample
    pub fn orientation(timestamp: u64, beta: f64, gamma: f64) -> Self {
        Self {
            timestamp,
            ax: None,
            ay: None,
            az: None,
            linear: None,
            beta: Some(beta),
            gamma: Some(gamma),
            alpha: None,
        }
    }

    pub fn with_linear(mut self, linear: Axes) -> Self {
        self.linear = Some(linear);
        self
    }

    pub fn with_orientation(mut self, beta: f64, gamma: f64, alpha: Option<f64>) -> Self {
        self.beta = Some(beta);
        self.gamma = Some(gamma);
        self.alpha = alpha;
        self
    }

    /// Gravity-inclusive axes, `None` unless all three were reported
    pub fn accel(&self) -> Option<Axes> {
        match (self.ax, self.ay, self.az) {
            (Some(x), Some(y), Some(z)) => Some(Axes::new(x, y, z)),
            _ => None,
        }
    }

    pub fn has_acceleration(&self) -> bool {
        self.accel().is_some()
    }

    /// Gravity-free acceleration when present, otherwise the raw reading
    pub fn step_accel(&self) -> Option<Axes> {
        self.linear.or_else(|| self.accel())
    }

    pub fn has_orientation(&self) -> bool {
        self.beta.is_some() || self.gamma.is_some()
    }
}
