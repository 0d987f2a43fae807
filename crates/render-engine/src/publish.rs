//! Upload metadata for rendered highlights.
//!
//! Exports named `<date>-<home>-<away>.mp4` carry everything a video host
//! needs for the title. Underscores in team names stand for `/`, so
//! `U12_U14` becomes `U12/U14`. Only the metadata is produced here; the
//! upload itself belongs to whichever client consumes it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// "People & Blogs" on the usual video host.
pub const DEFAULT_CATEGORY_ID: &str = "22";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    #[serde(rename = "public")]
    Public,
    #[serde(rename = "unlisted")]
    Unlisted,
    #[serde(rename = "private")]
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub privacy: Privacy,
    pub tags: Vec<String>,
    pub file: PathBuf,
}

impl UploadMetadata {
    /// Derive metadata from an export named `<date>-<home>-<away>.<ext>`.
    pub fn from_output_path(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let parts: Vec<&str> = stem.split('-').collect();
        let [date, home, away] = parts.as_slice() else {
            return Err(PublishError::UnrecognizedName { name: stem });
        };
        if [date, home, away].iter().any(|p| p.is_empty()) {
            return Err(PublishError::UnrecognizedName { name: stem });
        }

        let home = home.replace('_', "/");
        let away = away.replace('_', "/");
        Ok(Self {
            title: format!("[{date}] {home} vs {away}"),
            description: format!("Match highlights: {home} vs {away}"),
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            privacy: Privacy::Unlisted,
            tags: vec![home, away, "highlights".to_string()],
            file: path.to_path_buf(),
        })
    }

    /// Insert-request body in the `snippet`/`status` shape.
    pub fn to_request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "snippet": {
                "title": self.title,
                "description": self.description,
                "categoryId": self.category_id,
                "tags": self.tags,
            },
            "status": {
                "privacyStatus": self.privacy.as_str(),
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Export name '{name}' is not <date>-<home>-<away>")]
    UnrecognizedName { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_output_name() {
        let meta = UploadMetadata::from_output_path("exports/20260314-Eagles-U12_U14.mp4").unwrap();
        assert_eq!(meta.title, "[20260314] Eagles vs U12/U14");
        assert_eq!(meta.privacy, Privacy::Unlisted);
        assert_eq!(meta.category_id, "22");
        assert_eq!(meta.file, PathBuf::from("exports/20260314-Eagles-U12_U14.mp4"));
    }

    #[test]
    fn test_rejects_other_names() {
        for name in ["output.mp4", "2026-03-14-Eagles-Hawks.mp4", "20260314--Hawks.mp4"] {
            assert!(
                UploadMetadata::from_output_path(name).is_err(),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_request_body_shape() {
        let meta = UploadMetadata::from_output_path("20260314-A-B.mp4").unwrap();
        let body = meta.to_request_body();
        assert_eq!(body["snippet"]["categoryId"], "22");
        assert_eq!(body["status"]["privacyStatus"], "unlisted");
        assert_eq!(body["snippet"]["title"], "[20260314] A vs B");
    }
}
