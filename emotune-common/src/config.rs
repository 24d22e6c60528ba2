//! Configuration loading and resolution
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`EMOTUNE_CONFIG`)
//! 3. Platform config directory (`<config_dir>/emotune/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file at the platform location is not an error: the service
//! starts on compiled defaults with a warning. A file named explicitly on the
//! command line or in the environment must exist.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::emotion::EmotionLabel;
use crate::{Error, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "EMOTUNE_CONFIG";

/// Complete TOML configuration. Every section and field has a default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub detection: DetectionConfig,
    pub fade: FadeConfig,
    pub sounds: SoundsConfig,
    pub audio: AudioConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// When the driver asks the scheduler to play the mapped track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerPolicy {
    /// Every detected tick restarts the crossfade
    #[default]
    EveryTick,
    /// Only when the mapped track differs from the last one requested
    OnChange,
}

impl FromStr for RetriggerPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "every_tick" | "every-tick" => Ok(RetriggerPolicy::EveryTick),
            "on_change" | "on-change" => Ok(RetriggerPolicy::OnChange),
            other => Err(Error::Config(format!(
                "Unknown retrigger policy '{}' (expected every_tick or on_change)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Poll period of the detection loop
    pub poll_interval_ms: u64,
    pub retrigger: RetriggerPolicy,
}

impl DetectionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            retrigger: RetriggerPolicy::EveryTick,
        }
    }
}

/// Fade volumes are quantized to steps of `1 / VOLUME_RESOLUTION`
pub const VOLUME_RESOLUTION: f32 = 10_000.0;

/// Volume ramp parameters shared by fade-in and fade-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    pub tick_interval_ms: u64,
    /// Volume change per tick
    pub step: f32,
    /// Fade-out forces silence once volume is at or below this
    pub floor: f32,
    /// Fade-in forces full volume once volume is at or above this
    pub ceiling: f32,
}

impl FadeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            step: 0.1,
            floor: 0.1,
            ceiling: 0.9,
        }
    }
}

/// Label → audio file table. Relative file names resolve against `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundsConfig {
    pub dir: PathBuf,
    pub anger: PathBuf,
    pub happy: PathBuf,
    pub sad: PathBuf,
    pub neutral: PathBuf,
    pub surprised: PathBuf,
    pub fear: PathBuf,
}

impl SoundsConfig {
    /// Resolved path of the track bound to `label`
    pub fn path_for(&self, label: EmotionLabel) -> PathBuf {
        let file = match label {
            EmotionLabel::Anger => &self.anger,
            EmotionLabel::Happy => &self.happy,
            EmotionLabel::Sad => &self.sad,
            EmotionLabel::Neutral => &self.neutral,
            EmotionLabel::Surprised => &self.surprised,
            EmotionLabel::Fear => &self.fear,
        };
        self.dir.join(file)
    }
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./sounds"),
            anger: PathBuf::from("anger.mp3"),
            happy: PathBuf::from("happy.mp3"),
            sad: PathBuf::from("sad.mp3"),
            neutral: PathBuf::from("neutral.mp3"),
            surprised: PathBuf::from("surprised.mp3"),
            fear: PathBuf::from("fear.mp3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Disable audio output entirely (silent backend)
    pub enabled: bool,
    /// Output device name (None = default device)
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: None,
        }
    }
}

/// Cosmetic transition hints forwarded to the UI sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub background_transition_ms: u64,
    pub text_fade_ms: u64,
}

impl UiConfig {
    pub fn background_transition(&self) -> Duration {
        Duration::from_millis(self.background_transition_ms)
    }

    pub fn text_fade(&self) -> Duration {
        Duration::from_millis(self.text_fade_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            background_transition_ms: 1000,
            text_fade_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "emotune_player=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the fade and poll loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.detection.poll_interval_ms == 0 {
            return Err(Error::Config("detection.poll_interval_ms must be > 0".to_string()));
        }

        let fade = &self.fade;
        if fade.tick_interval_ms == 0 {
            return Err(Error::Config("fade.tick_interval_ms must be > 0".to_string()));
        }
        let min_step = 1.0 / VOLUME_RESOLUTION;
        if !(fade.step >= min_step && fade.step <= 1.0) {
            return Err(Error::Config(format!(
                "fade.step must be in [{}, 1], got {}",
                min_step, fade.step
            )));
        }
        for (name, value) in [("fade.floor", fade.floor), ("fade.ceiling", fade.ceiling)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    DefaultLocation(PathBuf),
    CompiledDefaults,
}

/// Platform config file location (`~/.config/emotune/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("emotune").join("config.toml"))
}

/// Resolves the config file using the full priority order
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    env_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver reading `EMOTUNE_CONFIG` and the platform config directory
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            env_path: std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
            default_path: default_config_path(),
        }
    }

    /// Resolver with every location given explicitly
    pub fn with_locations(
        cli_path: Option<PathBuf>,
        env_path: Option<PathBuf>,
        default_path: Option<PathBuf>,
    ) -> Self {
        Self {
            cli_path,
            env_path,
            default_path,
        }
    }

    pub fn resolve(&self) -> Result<(TomlConfig, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            let config = TomlConfig::load(path)?;
            info!("Loaded config from command line: {}", path.display());
            return Ok((config, ConfigSource::CommandLine(path.clone())));
        }

        // Priority 2: Environment variable
        if let Some(path) = &self.env_path {
            let config = TomlConfig::load(path)?;
            info!("Loaded config from {}: {}", CONFIG_ENV_VAR, path.display());
            return Ok((config, ConfigSource::Environment(path.clone())));
        }

        // Priority 3: Platform config directory
        if let Some(path) = &self.default_path {
            if path.exists() {
                let config = TomlConfig::load(path)?;
                info!("Loaded config from {}", path.display());
                return Ok((config, ConfigSource::DefaultLocation(path.clone())));
            }
        }

        // Priority 4: Compiled defaults
        warn!("No config file found, using compiled defaults");
        Ok((TomlConfig::default(), ConfigSource::CompiledDefaults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_constants() {
        let config = TomlConfig::default();
        assert_eq!(config.detection.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.fade.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.fade.step, 0.1);
        assert_eq!(config.fade.floor, 0.1);
        assert_eq!(config.fade.ceiling, 0.9);
        assert_eq!(config.detection.retrigger, RetriggerPolicy::EveryTick);
        assert!(config.audio.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [fade]
            step = 0.05

            [sounds]
            dir = "/srv/sounds"
            happy = "sunny.ogg"
            "#,
        )
        .unwrap();

        assert_eq!(config.fade.step, 0.05);
        assert_eq!(config.fade.floor, 0.1);
        assert_eq!(
            config.sounds.path_for(EmotionLabel::Happy),
            PathBuf::from("/srv/sounds/sunny.ogg")
        );
        assert_eq!(
            config.sounds.path_for(EmotionLabel::Sad),
            PathBuf::from("/srv/sounds/sad.mp3")
        );
        assert_eq!(config.detection.poll_interval_ms, 100);
    }

    #[test]
    fn test_retrigger_policy_parsing() {
        let config = TomlConfig::from_toml_str("[detection]\nretrigger = \"on_change\"\n").unwrap();
        assert_eq!(config.detection.retrigger, RetriggerPolicy::OnChange);
        assert_eq!("every-tick".parse::<RetriggerPolicy>().unwrap(), RetriggerPolicy::EveryTick);
        assert!("sometimes".parse::<RetriggerPolicy>().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_fade() {
        let mut config = TomlConfig::default();
        config.fade.step = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        // Below the volume grid a step would round away to nothing
        let mut config = TomlConfig::default();
        config.fade.step = 0.00004;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = TomlConfig::default();
        config.fade.step = 1.0 / VOLUME_RESOLUTION;
        assert!(config.validate().is_ok());

        let mut config = TomlConfig::default();
        config.fade.step = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.fade.ceiling = 1.2;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.fade.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.detection.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = TomlConfig::from_toml_str("[fade\nstep = ");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
