//! Configuration loading and validation

use anyhow::{Context, Result};
use replay_query::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// JSON replay dump to play back
    pub replay: Option<PathBuf>,
    /// Query file (blocks separated by blank lines); default queries if absent
    pub queries: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Playback speed multiplier; 0 disables pacing
    #[serde(default = "default_speed")]
    pub speed: f64,
    pub max_frames: Option<usize>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

fn default_speed() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            max_frames: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl PlaybackConfig {
    /// Extraction settings implied by the playback section
    pub fn extractor_config(&self) -> ExtractorConfig {
        let mut config = ExtractorConfig::new().with_time_range(self.start_time, self.end_time);
        if let Some(max) = self.max_frames {
            config = config.with_max_frames(max);
        }
        config
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Append query output to this file
    pub file: Option<PathBuf>,
    /// Print query output to stdout
    #[serde(default = "default_true")]
    pub echo: bool,
    /// Prefix output with the mm:ss replay clock
    #[serde(default = "default_true")]
    pub clock: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            echo: true,
            clock: true,
        }
    }
}

/// Configuration problems found after loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No replay file given (use --replay or [input] replay)")]
    MissingReplay,

    #[error("Playback speed must be a non-negative number, got {0}")]
    InvalidSpeed(f64),

    #[error("start_time ({start}) is after end_time ({end})")]
    InvalidTimeRange { start: f64, end: f64 },

    #[error("Nothing to show: output echo is off and no output file is set")]
    NoOutput,
}

impl AppConfig {
    /// Check the settings a run depends on
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.input.replay.is_none() {
            return Err(ConfigError::MissingReplay);
        }
        if !(self.playback.speed >= 0.0) || !self.playback.speed.is_finite() {
            return Err(ConfigError::InvalidSpeed(self.playback.speed));
        }
        if let (Some(start), Some(end)) = (self.playback.start_time, self.playback.end_time) {
            if start > end {
                return Err(ConfigError::InvalidTimeRange { start, end });
            }
        }
        if !self.output.echo && self.output.file.is_none() {
            return Err(ConfigError::NoOutput);
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
