//! Match project metadata and on-disk layout.
//!
//! A match project ties a source recording to its marker snapshot and the
//! team labels used on the score overlay:
//!
//! ```text
//! <root>/
//!   meta/project.json   project metadata
//!   meta/markers.json   marker snapshot
//!   exports/            rendered highlight videos
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::marker::{MarkerStore, SnapshotError, TimestampMs};

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchProject {
    /// Schema version.
    pub version: String,

    /// Human-readable match name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Recorded match video.
    pub source: Option<SourceMedia>,

    /// Labels shown on the score overlay.
    #[serde(default)]
    pub teams: Teams,
}

/// Reference to the recorded match video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Path to the media file, absolute or relative to the project root.
    pub path: String,

    /// Duration in milliseconds, once known.
    #[serde(default)]
    pub duration_ms: Option<TimestampMs>,
}

/// Side labels for the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    pub home: String,
    pub away: String,
}

impl Default for Teams {
    fn default() -> Self {
        Self {
            home: "Home".to_string(),
            away: "Away".to_string(),
        }
    }
}

impl MatchProject {
    /// Create a new project with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            name: name.into(),
            id: uuid_v4(),
            created_at: now.clone(),
            modified_at: now,
            source: None,
            teams: Teams::default(),
        }
    }

    /// Mark the project as modified now.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

/// The complete in-memory representation of a loaded match.
#[derive(Debug, Clone)]
pub struct LoadedMatch {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project metadata.
    pub project: MatchProject,

    /// Tagged markers.
    pub markers: MarkerStore,
}

impl LoadedMatch {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        let project_path = root.join("meta").join("project.json");
        let markers_path = root.join("meta").join("markers.json");

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: MatchProject =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        let mut markers = match project.source.as_ref().and_then(|s| s.duration_ms) {
            Some(duration) => MarkerStore::with_duration(duration),
            None => MarkerStore::new(),
        };
        if markers_path.exists() {
            markers.load_file(&markers_path)?;
        }

        Ok(Self {
            root,
            project,
            markers,
        })
    }

    /// Save project metadata and markers to disk.
    pub fn save(&self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        let project_path = meta_dir.join("project.json");
        let project_json =
            serde_json::to_string_pretty(&self.project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        self.markers.save_file(self.markers_path())?;

        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(
        root: impl AsRef<Path>,
        name: impl Into<String>,
        source: Option<SourceMedia>,
        teams: Teams,
    ) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let mut project = MatchProject::new(name);
        project.teams = teams;
        let markers = match source.as_ref().and_then(|s| s.duration_ms) {
            Some(duration) => MarkerStore::with_duration(duration),
            None => MarkerStore::new(),
        };
        project.source = source;

        let loaded = Self {
            root,
            project,
            markers,
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Path of the marker snapshot file.
    pub fn markers_path(&self) -> PathBuf {
        self.root.join("meta").join("markers.json")
    }

    /// Directory for rendered exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Resolved path of the source media, if one is attached.
    pub fn source_path(&self) -> Option<PathBuf> {
        self.project.source.as_ref().map(|source| {
            let path = PathBuf::from(&source.path);
            if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            }
        })
    }

    /// Record the probed media duration on both the project and the store.
    /// Returns how many markers had to be clamped.
    pub fn set_duration(&mut self, duration_ms: TimestampMs) -> usize {
        if let Some(source) = self.project.source.as_mut() {
            source.duration_ms = Some(duration_ms);
        }
        self.markers.set_duration(duration_ms)
    }

    /// Validate that the referenced source file exists.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        match (&self.project.source, self.source_path()) {
            (Some(source), Some(path)) if !path.exists() => {
                errors.push(format!("Source media missing: {}", source.path));
            }
            (None, _) => errors.push("No source media attached".to_string()),
            _ => {}
        }

        if !self.markers_path().exists() {
            errors.push("Markers file missing: meta/markers.json".to_string());
        }

        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<ProjectError> for rallymark_common::RallymarkError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::Snapshot(err) => err.into(),
            other => Self::project(other.to_string()),
        }
    }
}

/// Generate a simple UUID v4 without external dependency.
fn uuid_v4() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFFFFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3F) | 0x80) as u16 | (((seed >> 66) & 0x3FF) as u16) << 6,
        (seed >> 76) & 0xFFFFFFFFFFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{Marker, MarkerType};

    fn temp_project_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rallymark_test_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_project_creation() {
        let project = MatchProject::new("Friday league");
        assert_eq!(project.name, "Friday league");
        assert_eq!(project.version, "1.0");
        assert_eq!(project.teams, Teams::default());
        assert!(project.source.is_none());
    }

    #[test]
    fn test_legacy_project_without_teams_defaults() {
        let raw = r#"{
            "version":"1.0",
            "name":"Old",
            "id":"x",
            "created_at":"2026-01-01T00:00:00Z",
            "modified_at":"2026-01-01T00:00:00Z",
            "source":{"path":"match.mp4"}
        }"#;
        let parsed: MatchProject = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.teams.home, "Home");
        assert_eq!(parsed.source.unwrap().duration_ms, None);
    }

    #[test]
    fn test_loaded_match_create_save_and_load() {
        let dir = temp_project_dir("roundtrip");

        let mut created = LoadedMatch::create(
            &dir,
            "Roundtrip",
            Some(SourceMedia {
                path: "match.mp4".to_string(),
                duration_ms: Some(60_000),
            }),
            Teams {
                home: "Eagles".to_string(),
                away: "Hawks".to_string(),
            },
        )
        .unwrap();
        created.markers.add(MarkerType::Serve, 1_000);
        created.markers.add(MarkerType::HomePoint, 90_000);
        created.save().unwrap();

        let loaded = LoadedMatch::load(&dir).unwrap();
        assert_eq!(loaded.project.teams.home, "Eagles");
        assert_eq!(loaded.markers.duration_ms(), Some(60_000));
        assert_eq!(
            loaded.markers.snapshot(),
            vec![
                Marker::new(MarkerType::Serve, 1_000),
                Marker::new(MarkerType::HomePoint, 60_000),
            ]
        );
        assert_eq!(loaded.source_path(), Some(dir.join("match.mp4")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_surfaces_malformed_markers() {
        let dir = temp_project_dir("malformed");
        let created = LoadedMatch::create(&dir, "Broken", None, Teams::default()).unwrap();
        std::fs::write(created.markers_path(), r#"{"10": "Ace"}"#).unwrap();

        let err = LoadedMatch::load(&dir).unwrap_err();
        assert!(matches!(
            err,
            ProjectError::Snapshot(SnapshotError::MalformedSnapshot(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_errors_convert_to_rallymark_error() {
        let err: rallymark_common::RallymarkError =
            ProjectError::Snapshot(SnapshotError::MalformedSnapshot("bad".into())).into();
        assert!(matches!(err, rallymark_common::RallymarkError::Marker { .. }));
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let dir = temp_project_dir("validate");
        let loaded = LoadedMatch::create(
            &dir,
            "Validate",
            Some(SourceMedia {
                path: "missing.mp4".to_string(),
                duration_ms: None,
            }),
            Teams::default(),
        )
        .unwrap();

        let errors = loaded.validate_sources();
        assert!(errors.iter().any(|e| e.contains("Source media missing")));

        std::fs::remove_dir_all(&dir).ok();
    }
}
