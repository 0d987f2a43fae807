//! Derived timeline values: clip ranges and running scores.
//!
//! Neither type is ever persisted; both are recomputed from a marker
//! snapshot whenever they are needed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::marker::{MarkerType, TimestampMs};

/// A playable interval from a serve to the marker that closed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRange {
    /// Timestamp of the opening serve.
    pub start_ms: TimestampMs,
    /// Timestamp of the closing marker.
    pub end_ms: TimestampMs,
    /// How the rally ended. Never `Serve`.
    pub point_type: MarkerType,
}

impl ClipRange {
    pub fn new(start_ms: TimestampMs, end_ms: TimestampMs, point_type: MarkerType) -> Self {
        Self {
            start_ms,
            end_ms,
            point_type,
        }
    }

    /// Length of the clip in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Home/away tally at some point in the match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreState {
    pub home: u32,
    pub away: u32,
}

impl ScoreState {
    pub const ZERO: ScoreState = ScoreState { home: 0, away: 0 };

    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Overlay text, e.g. `Eagles 3 - 2 Hawks`.
    pub fn scoreline(&self, home_label: &str, away_label: &str) -> String {
        format!(
            "{home_label} {} - {} {away_label}",
            self.home, self.away
        )
    }
}

impl fmt::Display for ScoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = ClipRange::new(1_000, 4_500, MarkerType::HomePoint);
        assert_eq!(clip.duration_ms(), 3_500);
    }

    #[test]
    fn test_scoreline_format() {
        let score = ScoreState::new(3, 2);
        assert_eq!(score.scoreline("Eagles", "Hawks"), "Eagles 3 - 2 Hawks");
        assert_eq!(score.to_string(), "3-2");
        assert_eq!(ScoreState::default(), ScoreState::ZERO);
    }

    #[test]
    fn test_clip_serializes_with_labels() {
        let clip = ClipRange::new(0, 1_000, MarkerType::AwayPoint);
        let json = serde_json::to_string(&clip).unwrap();
        assert_eq!(
            json,
            r#"{"start_ms":0,"end_ms":1000,"point_type":"Away point"}"#
        );
    }
}
