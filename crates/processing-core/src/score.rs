//! Running score computation.
//!
//! A point only registers once playback has passed it, so `score_at` counts
//! markers strictly before the query instant. Exports use the incremental
//! `score_for_clip` instead of rescanning; across a planned clip sequence the
//! two agree: the running total before a clip equals `score_at(clip.end_ms)`.

use rallymark_project_model::clip::{ClipRange, ScoreState};
use rallymark_project_model::marker::{Marker, MarkerType, TimestampMs};

/// Score from every point marker strictly before `at_ms`.
pub fn score_at(markers: &[Marker], at_ms: TimestampMs) -> ScoreState {
    markers
        .iter()
        .filter(|m| m.timestamp_ms < at_ms)
        .fold(ScoreState::ZERO, |mut score, m| {
            match m.marker_type {
                MarkerType::HomePoint => score.home += 1,
                MarkerType::AwayPoint => score.away += 1,
                MarkerType::Serve | MarkerType::NoPoint => {}
            }
            score
        })
}

/// Running total after `clip`, given the total before it.
pub fn score_for_clip(clip: &ClipRange, running: ScoreState) -> ScoreState {
    match clip.point_type {
        MarkerType::HomePoint => ScoreState::new(running.home + 1, running.away),
        MarkerType::AwayPoint => ScoreState::new(running.home, running.away + 1),
        MarkerType::Serve | MarkerType::NoPoint => running,
    }
}

/// Running total after each clip, starting from zero.
pub fn running_scores(clips: &[ClipRange]) -> Vec<ScoreState> {
    clips
        .iter()
        .scan(ScoreState::ZERO, |running, clip| {
            *running = score_for_clip(clip, *running);
            Some(*running)
        })
        .collect()
}
