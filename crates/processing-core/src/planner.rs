//! Serve/point pairing.
//!
//! Walks an ordered marker stream once and pairs every `Serve` with the next
//! marker that closes the rally. The scan fails fast on a serve that is
//! followed by another serve, and on a close marker with no open serve. A
//! serve left open at the very end of the stream produces no clip and is not
//! an error.

use rallymark_common::clock::format_secs;
use rallymark_common::error::RallymarkError;
use rallymark_project_model::clip::ClipRange;
use rallymark_project_model::marker::{Marker, MarkerType, TimestampMs};

/// Malformed marker sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// A serve was followed by another serve before anything closed it.
    #[error("Serve at {} was never closed before the next serve", secs(.0))]
    DanglingServe(TimestampMs),

    /// A point outcome appeared with no open serve.
    #[error("{1} at {} has no preceding serve", secs(.0))]
    OrphanCloseMarker(TimestampMs, MarkerType),
}

fn secs(ts: &TimestampMs) -> String {
    format_secs(*ts)
}

impl From<PlanError> for RallymarkError {
    fn from(err: PlanError) -> Self {
        RallymarkError::planning(err.to_string())
    }
}

/// Derive clip ranges from markers sorted ascending by timestamp.
pub fn plan(markers: &[Marker]) -> Result<Vec<ClipRange>, PlanError> {
    let mut clips = Vec::new();
    let mut pending_start: Option<TimestampMs> = None;

    for marker in markers {
        match (marker.marker_type, pending_start) {
            (MarkerType::Serve, Some(previous)) => {
                return Err(PlanError::DanglingServe(previous));
            }
            (MarkerType::Serve, None) => {
                pending_start = Some(marker.timestamp_ms);
            }
            (close, None) => {
                return Err(PlanError::OrphanCloseMarker(marker.timestamp_ms, close));
            }
            (close, Some(start)) => {
                clips.push(ClipRange::new(start, marker.timestamp_ms, close));
                pending_start = None;
            }
        }
    }

    if let Some(start) = pending_start {
        tracing::debug!(
            serve_ms = start,
            "Trailing serve has no closing marker; no clip emitted"
        );
    }

    tracing::debug!(markers = markers.len(), clips = clips.len(), "Clip plan built");
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(marker_type: MarkerType, ts: u64) -> Marker {
        Marker::new(marker_type, ts)
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(plan(&[]).unwrap(), vec![]);
    }

    #[test]
    fn test_single_rally() {
        let clips = plan(&[m(MarkerType::Serve, 0), m(MarkerType::HomePoint, 1_000)]).unwrap();
        assert_eq!(clips, vec![ClipRange::new(0, 1_000, MarkerType::HomePoint)]);
    }

    #[test]
    fn test_consecutive_serves_fail_with_first_serve() {
        let err = plan(&[m(MarkerType::Serve, 0), m(MarkerType::Serve, 500)]).unwrap_err();
        assert_eq!(err, PlanError::DanglingServe(0));
    }

    #[test]
    fn test_close_before_serve_is_orphan() {
        let err = plan(&[m(MarkerType::HomePoint, 100)]).unwrap_err();
        assert_eq!(err, PlanError::OrphanCloseMarker(100, MarkerType::HomePoint));
    }

    #[test]
    fn test_trailing_serve_is_dropped() {
        let clips = plan(&[
            m(MarkerType::Serve, 0),
            m(MarkerType::HomePoint, 1_000),
            m(MarkerType::Serve, 2_000),
        ])
        .unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].end_ms, 1_000);
    }

    #[test]
    fn test_lone_serve_yields_nothing() {
        assert!(plan(&[m(MarkerType::Serve, 7)]).unwrap().is_empty());
    }

    #[test]
    fn test_full_match_sequence() {
        let clips = plan(&[
            m(MarkerType::Serve, 1_000),
            m(MarkerType::AwayPoint, 4_000),
            m(MarkerType::Serve, 6_000),
            m(MarkerType::NoPoint, 6_500),
            m(MarkerType::Serve, 9_000),
            m(MarkerType::HomePoint, 15_000),
        ])
        .unwrap();

        assert_eq!(
            clips,
            vec![
                ClipRange::new(1_000, 4_000, MarkerType::AwayPoint),
                ClipRange::new(6_000, 6_500, MarkerType::NoPoint),
                ClipRange::new(9_000, 15_000, MarkerType::HomePoint),
            ]
        );
    }

    #[test]
    fn test_orphan_after_completed_rally() {
        let err = plan(&[
            m(MarkerType::Serve, 0),
            m(MarkerType::NoPoint, 100),
            m(MarkerType::AwayPoint, 200),
        ])
        .unwrap_err();
        assert_eq!(err, PlanError::OrphanCloseMarker(200, MarkerType::AwayPoint));
    }

    #[test]
    fn test_error_messages_name_the_instant() {
        assert_eq!(
            PlanError::DanglingServe(1_500).to_string(),
            "Serve at 1.50s was never closed before the next serve"
        );
        assert_eq!(
            PlanError::OrphanCloseMarker(250, MarkerType::AwayPoint).to_string(),
            "Away point at 0.25s has no preceding serve"
        );
    }
}
