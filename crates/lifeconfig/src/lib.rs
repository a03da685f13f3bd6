use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Roughly one 60 Hz display refresh.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_666);

/// Fraction of cells brought to life when a generation is reseeded.
pub const DEFAULT_SEED_PROBABILITY: f64 = 0.25;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPower {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifeConfig {
    pub version: u32,
    #[serde(
        default = "default_frame_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub frame_interval: Duration,
    #[serde(default = "default_seed_probability")]
    pub seed_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub gpu: GpuSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "lifepaper".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GpuSettings {
    pub power: GpuPower,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            seed_probability: DEFAULT_SEED_PROBABILITY,
            seed: None,
            window: WindowSettings::default(),
            gpu: GpuSettings::default(),
        }
    }
}

fn default_frame_interval() -> Duration {
    DEFAULT_FRAME_INTERVAL
}

fn default_seed_probability() -> f64 {
    DEFAULT_SEED_PROBABILITY
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_infinite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

/// Converts a frames-per-second cap into a frame interval. Non-positive or
/// non-finite values yield `None`.
pub fn interval_for_fps(fps: f32) -> Option<Duration> {
    if fps.is_finite() && fps > 0.0 {
        Some(Duration::from_secs_f64(1.0 / f64::from(fps)))
    } else {
        None
    }
}

impl LifeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LifeConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Like [`LifeConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.frame_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "frame_interval must be greater than zero".into(),
            ));
        }

        validate_probability(self.seed_probability)?;

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        Ok(())
    }
}

pub fn validate_probability(probability: f64) -> Result<(), ConfigError> {
    if !(probability > 0.0 && probability <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "seed_probability must be in (0, 1], got {probability}"
        )));
    }
    Ok(())
}
