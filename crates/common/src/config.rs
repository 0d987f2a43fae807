//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where match projects are stored.
    pub projects_dir: PathBuf,

    /// Default export settings.
    pub export: ExportDefaults,

    /// Default score overlay settings.
    pub overlay: OverlayDefaults,

    /// Interactive tagging settings.
    pub playback: PlaybackDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output file name used when no path is given.
    pub output_name: String,

    /// Output frame rate.
    pub fps: u32,

    /// ffmpeg video encoder (e.g. "libx264").
    pub video_codec: String,

    /// Encoder preset.
    pub preset: String,

    /// Constant rate factor for the video encoder.
    pub crf: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// Default score overlay parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayDefaults {
    /// Label for the home side.
    pub home_label: String,

    /// Label for the away side.
    pub away_label: String,

    /// Font size for the score text, in output pixels.
    pub font_size: u32,

    /// Distance from the top edge, in output pixels.
    pub margin_top: u32,

    /// Optional scoreboard background image composited behind the text.
    pub scoreboard_image: Option<PathBuf>,
}

/// Interactive tagging parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// How far "back" jumps, in milliseconds.
    pub seek_back_ms: u64,

    /// How long to wait for the media duration to be probed.
    pub duration_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "rallymark=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            export: ExportDefaults::default(),
            overlay: OverlayDefaults::default(),
            playback: PlaybackDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            output_name: "output.mp4".to_string(),
            fps: 30,
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 20,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self {
            home_label: "Home".to_string(),
            away_label: "Away".to_string(),
            font_size: 48,
            margin_top: 24,
            scoreboard_image: None,
        }
    }
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            seek_back_ms: 5_000,
            duration_timeout_ms: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("rallymark").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("rallymark").join("projects")
}
