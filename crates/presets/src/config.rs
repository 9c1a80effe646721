use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glowshader::sequence::{MAX_FRAMES, MIN_FRAMES};
use glowshader::AnimationMode;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlowConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub output: OutputDefaults,
    #[serde(default)]
    pub animation: AnimationDefaults,
    #[serde(default)]
    pub preview: PreviewDefaults,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OutputDefaults {
    /// Where exported PNGs land when `--out-dir` is not given.
    pub directory: Option<PathBuf>,
    /// Base name for exported files.
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationDefaults {
    #[serde(deserialize_with = "deserialize_mode")]
    pub mode: AnimationMode,
    pub amount: f32,
    pub frames: usize,
}

impl Default for AnimationDefaults {
    fn default() -> Self {
        Self {
            mode: AnimationMode::SeedSweep,
            amount: 1.0,
            frames: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewDefaults {
    pub canvas: u32,
    pub pixel_ratio: f32,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub elapsed: Duration,
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            canvas: 512,
            pixel_ratio: 1.0,
            elapsed: Duration::ZERO,
        }
    }
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            output: OutputDefaults::default(),
            animation: AnimationDefaults::default(),
            preview: PreviewDefaults::default(),
        }
    }
}

fn default_version() -> u32 {
    1
}

fn deserialize_mode<'de, D>(deserializer: D) -> Result<AnimationMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    AnimationMode::parse(&raw).map_err(de::Error::custom)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> de::Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration like \"1.5s\" or a number of seconds")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim()).map_err(E::custom)
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
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl GlowConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GlowConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let animation = &self.animation;
        if !(MIN_FRAMES..=MAX_FRAMES).contains(&animation.frames) {
            return Err(ConfigError::Invalid(format!(
                "animation.frames must lie in {MIN_FRAMES}..={MAX_FRAMES} (got {})",
                animation.frames
            )));
        }
        if !animation.amount.is_finite() || animation.amount <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "animation.amount must be greater than zero (got {})",
                animation.amount
            )));
        }

        if self.preview.canvas == 0 {
            return Err(ConfigError::Invalid(
                "preview.canvas must be greater than zero".into(),
            ));
        }
        if !self.preview.pixel_ratio.is_finite() || self.preview.pixel_ratio <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "preview.pixel_ratio must be greater than zero (got {})",
                self.preview.pixel_ratio
            )));
        }

        if let Some(name) = &self.output.name {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("output.name may not be empty".into()));
            }
        }

        Ok(())
    }
}
