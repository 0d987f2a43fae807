//! Error types shared across RallyMark crates.

use std::path::PathBuf;

/// Top-level error type for RallyMark operations.
#[derive(Debug, thiserror::Error)]
pub enum RallymarkError {
    #[error("Marker error: {message}")]
    Marker { message: String },

    #[error("Planning error: {message}")]
    Planning { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Timed out: {message}")]
    Timeout { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RallymarkError.
pub type RallymarkResult<T> = Result<T, RallymarkError>;

impl RallymarkError {
    pub fn marker(msg: impl Into<String>) -> Self {
        Self::Marker {
            message: msg.into(),
        }
    }

    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
