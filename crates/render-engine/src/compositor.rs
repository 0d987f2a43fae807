//! Overlay composition: what gets drawn on each exported clip.
//!
//! Pure functions over planned clips. The running score shown on a clip
//! already includes that clip's own point.

use std::path::PathBuf;

use rallymark_common::config::OverlayDefaults;
use rallymark_processing_core::score_for_clip;
use rallymark_project_model::clip::{ClipRange, ScoreState};
use rallymark_project_model::project::Teams;

use crate::media::{ImageLayer, OverlayPosition, TextLayer};

/// How the score overlay looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub home_label: String,
    pub away_label: String,
    /// Drawn behind the score text, top-center.
    pub scoreboard_image: Option<PathBuf>,
    pub font_size: u32,
    pub margin_top: u32,
}

impl Default for OverlaySpec {
    fn default() -> Self {
        Self::from_defaults(&OverlayDefaults::default())
    }
}

impl OverlaySpec {
    pub fn from_defaults(defaults: &OverlayDefaults) -> Self {
        Self {
            home_label: defaults.home_label.clone(),
            away_label: defaults.away_label.clone(),
            scoreboard_image: defaults.scoreboard_image.clone(),
            font_size: defaults.font_size,
            margin_top: defaults.margin_top,
        }
    }

    /// Configured styling with a project's team labels.
    pub fn for_teams(defaults: &OverlayDefaults, teams: &Teams) -> Self {
        Self {
            home_label: teams.home.clone(),
            away_label: teams.away.clone(),
            ..Self::from_defaults(defaults)
        }
    }

    fn position(&self) -> OverlayPosition {
        OverlayPosition::TopCenter {
            margin: self.margin_top,
        }
    }
}

/// Layers for a single clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipComposition {
    pub clip: ClipRange,
    /// Running score after this clip.
    pub score: ScoreState,
    pub text: TextLayer,
    pub image: Option<ImageLayer>,
}

/// Compute the overlay layers for every clip, in order.
pub fn compose_overlays(clips: &[ClipRange], spec: &OverlaySpec) -> Vec<ClipComposition> {
    let mut running = ScoreState::ZERO;
    clips
        .iter()
        .map(|clip| {
            running = score_for_clip(clip, running);
            let duration_ms = clip.duration_ms();
            ClipComposition {
                clip: *clip,
                score: running,
                text: TextLayer {
                    text: running.scoreline(&spec.home_label, &spec.away_label),
                    font_size: spec.font_size,
                    position: spec.position(),
                    duration_ms,
                },
                image: spec.scoreboard_image.as_ref().map(|path| ImageLayer {
                    path: path.clone(),
                    position: spec.position(),
                    duration_ms,
                }),
            }
        })
        .collect()
}
