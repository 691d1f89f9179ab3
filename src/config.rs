use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::detector::DetectorConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FitmotionConfig {
    pub sampler: SamplerConfig,
    pub shake: ShakeConfig,
    pub tilt: TiltConfig,
    pub step: StepConfig,
    pub actions: ActionsConfig,
    pub desktop: DesktopConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SamplerConfig {
    /// Minimum spacing between two delivered samples in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Capacity of the raw sample channel between platform and sampler
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShakeConfig {
    /// Shake detection enabled at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Speed threshold (summed-axis jerk metric)
    #[serde(default = "default_shake_threshold")]
    pub threshold: f64,

    /// Minimum time between two shake events in milliseconds
    #[serde(default = "default_shake_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Lowest threshold accepted by set_shake_threshold (most sensitive)
    #[serde(default = "default_shake_min_threshold")]
    pub min_threshold: f64,

    /// Highest threshold accepted by set_shake_threshold (least sensitive)
    #[serde(default = "default_shake_max_threshold")]
    pub max_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TiltConfig {
    /// Tilt (and step) detection enabled at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Deflection in degrees of beta or gamma that counts as a tilt
    #[serde(default = "default_tilt_angle")]
    pub angle_degrees: f64,

    /// Minimum time between two tilt events in milliseconds
    #[serde(default = "default_tilt_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StepConfig {
    /// Acceleration delta that registers a step
    #[serde(default = "default_step_trigger_delta")]
    pub trigger_delta: f64,

    /// Acceleration delta below which the in-progress step clears
    #[serde(default = "default_step_reset_delta")]
    pub reset_delta: f64,

    /// Emit a milestone every this many steps
    #[serde(default = "default_milestone_interval")]
    pub milestone_interval: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActionsConfig {
    /// Navigation whitelist used for shake navigation
    #[serde(default = "default_routes")]
    pub routes: Vec<String>,

    /// Notification duration for shake messages
    #[serde(default = "default_shake_notice_ms")]
    pub shake_notice_ms: u64,

    /// Notification duration for tilt quotes
    #[serde(default = "default_tilt_notice_ms")]
    pub tilt_notice_ms: u64,

    /// Notification duration for step milestones
    #[serde(default = "default_step_notice_ms")]
    pub step_notice_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DesktopConfig {
    /// Key that synthesizes a shake
    #[serde(default = "default_shake_key")]
    pub shake_key: String,

    /// Key that synthesizes a tilt
    #[serde(default = "default_tilt_key")]
    pub tilt_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl ShakeConfig {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::new(self.enabled, self.threshold, self.cooldown_ms)
    }

    /// Clamp a requested threshold into the sensitivity range
    pub fn clamp_threshold(&self, value: f64) -> f64 {
        value.clamp(self.min_threshold, self.max_threshold)
    }
}

impl TiltConfig {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::new(self.enabled, self.angle_degrees, self.rate_limit_ms)
    }
}

impl StepConfig {
    /// Steps follow the tilt toggle; the threshold is the trigger delta
    pub fn detector_config(&self, enabled: bool) -> DetectorConfig {
        DetectorConfig::new(enabled, self.trigger_delta, 0)
    }
}

impl DesktopConfig {
    pub fn shake_char(&self) -> Option<char> {
        single_char(&self.shake_key)
    }

    pub fn tilt_char(&self) -> Option<char> {
        single_char(&self.tilt_key)
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

impl FitmotionConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("fitmotion.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("sampler.min_interval_ms", default_min_interval_ms() as i64)?
            .set_default(
                "sampler.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("shake.enabled", default_enabled())?
            .set_default("shake.threshold", default_shake_threshold())?
            .set_default("shake.cooldown_ms", default_shake_cooldown_ms() as i64)?
            .set_default("shake.min_threshold", default_shake_min_threshold())?
            .set_default("shake.max_threshold", default_shake_max_threshold())?
            .set_default("tilt.enabled", default_enabled())?
            .set_default("tilt.angle_degrees", default_tilt_angle())?
            .set_default("tilt.rate_limit_ms", default_tilt_rate_limit_ms() as i64)?
            .set_default("step.trigger_delta", default_step_trigger_delta())?
            .set_default("step.reset_delta", default_step_reset_delta())?
            .set_default(
                "step.milestone_interval",
                default_milestone_interval() as i64,
            )?
            .set_default("actions.routes", default_routes())?
            .set_default("actions.shake_notice_ms", default_shake_notice_ms() as i64)?
            .set_default("actions.tilt_notice_ms", default_tilt_notice_ms() as i64)?
            .set_default("actions.step_notice_ms", default_step_notice_ms() as i64)?
            .set_default("desktop.shake_key", default_shake_key())?
            .set_default("desktop.tilt_key", default_tilt_key())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables, e.g. FITMOTION_SHAKE__THRESHOLD=12
            .add_source(
                Environment::with_prefix("FITMOTION")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: FitmotionConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampler.min_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Sampler min_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.sampler.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Sampler channel_capacity must be greater than 0".to_string(),
            ));
        }

        // Shake sensitivity
        if self.shake.min_threshold <= 0.0 || self.shake.min_threshold > self.shake.max_threshold
        {
            return Err(ConfigError::Message(format!(
                "Shake sensitivity range {}..{} is invalid",
                self.shake.min_threshold, self.shake.max_threshold
            )));
        }

        if !(self.shake.min_threshold..=self.shake.max_threshold).contains(&self.shake.threshold)
        {
            return Err(ConfigError::Message(format!(
                "Shake threshold {} must lie within {}..{}",
                self.shake.threshold, self.shake.min_threshold, self.shake.max_threshold
            )));
        }

        if self.tilt.angle_degrees <= 0.0 || self.tilt.angle_degrees >= 180.0 {
            return Err(ConfigError::Message(
                "Tilt angle_degrees must be between 0 and 180".to_string(),
            ));
        }

        // Step debounce needs a gap between the two levels
        if self.step.reset_delta <= 0.0 || self.step.reset_delta >= self.step.trigger_delta {
            return Err(ConfigError::Message(
                "Step reset_delta must be positive and below trigger_delta".to_string(),
            ));
        }

        if self.step.milestone_interval == 0 {
            return Err(ConfigError::Message(
                "Step milestone_interval must be greater than 0".to_string(),
            ));
        }

        if self.actions.routes.is_empty() {
            return Err(ConfigError::Message(
                "At least one navigation route is required".to_string(),
            ));
        }

        if let Some(route) = self.actions.routes.iter().find(|r| !r.starts_with('/')) {
            return Err(ConfigError::Message(format!(
                "Navigation route '{}' must start with '/'",
                route
            )));
        }

        match (self.desktop.shake_char(), self.desktop.tilt_char()) {
            (Some(shake), Some(tilt)) if shake != tilt => {}
            (Some(_), Some(_)) => {
                return Err(ConfigError::Message(
                    "Desktop shake_key and tilt_key must differ".to_string(),
                ));
            }
            _ => {
                return Err(ConfigError::Message(
                    "Desktop keys must be single characters".to_string(),
                ));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for FitmotionConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig {
                min_interval_ms: default_min_interval_ms(),
                channel_capacity: default_channel_capacity(),
            },
            shake: ShakeConfig {
                enabled: default_enabled(),
                threshold: default_shake_threshold(),
                cooldown_ms: default_shake_cooldown_ms(),
                min_threshold: default_shake_min_threshold(),
                max_threshold: default_shake_max_threshold(),
            },
            tilt: TiltConfig {
                enabled: default_enabled(),
                angle_degrees: default_tilt_angle(),
                rate_limit_ms: default_tilt_rate_limit_ms(),
            },
            step: StepConfig {
                trigger_delta: default_step_trigger_delta(),
                reset_delta: default_step_reset_delta(),
                milestone_interval: default_milestone_interval(),
            },
            actions: ActionsConfig {
                routes: default_routes(),
                shake_notice_ms: default_shake_notice_ms(),
                tilt_notice_ms: default_tilt_notice_ms(),
                step_notice_ms: default_step_notice_ms(),
            },
            desktop: DesktopConfig {
                shake_key: default_shake_key(),
                tilt_key: default_tilt_key(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_min_interval_ms() -> u64 {
    100
}
fn default_channel_capacity() -> usize {
    64
}

fn default_enabled() -> bool {
    true
}
fn default_shake_threshold() -> f64 {
    8.0
}
fn default_shake_cooldown_ms() -> u64 {
    800
}
fn default_shake_min_threshold() -> f64 {
    5.0
}
fn default_shake_max_threshold() -> f64 {
    25.0
}

fn default_tilt_angle() -> f64 {
    45.0
}
fn default_tilt_rate_limit_ms() -> u64 {
    1000
}

fn default_step_trigger_delta() -> f64 {
    10.0
}
fn default_step_reset_delta() -> f64 {
    2.0
}
fn default_milestone_interval() -> u64 {
    10
}

fn default_routes() -> Vec<String> {
    ["/home", "/recipes", "/calories", "/profile", "/qr-scanner"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}
fn default_shake_notice_ms() -> u64 {
    5000
}
fn default_tilt_notice_ms() -> u64 {
    4000
}
fn default_step_notice_ms() -> u64 {
    4000
}

fn default_shake_key() -> String {
    "s".to_string()
}
fn default_tilt_key() -> String {
    "t".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
