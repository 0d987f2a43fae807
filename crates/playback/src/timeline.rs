//! Timeline strip mapping.
//!
//! A timeline is a horizontal strip where x is proportional to playback
//! time. Clicking it seeks; markers are drawn at their proportional offset
//! in their type's colour. The terminal renderer uses one glyph per type.

use rallymark_project_model::marker::{Marker, MarkerType, TimestampMs};

/// Fractional position of `timestamp_ms` along a strip, in `[0, 1]`.
pub fn ratio_at(timestamp_ms: TimestampMs, duration_ms: TimestampMs) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (timestamp_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}

/// Playback time under a click at `ratio` along the strip.
pub fn time_at_ratio(ratio: f64, duration_ms: TimestampMs) -> TimestampMs {
    if !ratio.is_finite() {
        return 0;
    }
    (ratio.clamp(0.0, 1.0) * duration_ms as f64).round() as TimestampMs
}

/// Column for a timestamp on a strip `width` cells wide.
pub fn column_at(timestamp_ms: TimestampMs, duration_ms: TimestampMs, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    let col = (ratio_at(timestamp_ms, duration_ms) * width as f64) as usize;
    col.min(width - 1)
}

pub fn glyph(marker_type: MarkerType) -> char {
    match marker_type {
        MarkerType::Serve => 'S',
        MarkerType::NoPoint => 'o',
        MarkerType::HomePoint => 'H',
        MarkerType::AwayPoint => 'A',
    }
}

/// Render markers onto a text strip. Later markers win a shared cell; the
/// playhead, if given, is drawn last as `|`.
pub fn render_strip(
    markers: &[Marker],
    duration_ms: TimestampMs,
    width: usize,
    playhead_ms: Option<TimestampMs>,
) -> String {
    let mut cells = vec!['-'; width];
    if width == 0 {
        return String::new();
    }
    for marker in markers {
        cells[column_at(marker.timestamp_ms, duration_ms, width)] = glyph(marker.marker_type);
    }
    if let Some(at) = playhead_ms {
        cells[column_at(at, duration_ms, width)] = '|';
    }
    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_and_click_mapping() {
        assert_eq!(ratio_at(30_000, 60_000), 0.5);
        assert_eq!(ratio_at(90_000, 60_000), 1.0);
        assert_eq!(ratio_at(10, 0), 0.0);

        assert_eq!(time_at_ratio(0.25, 60_000), 15_000);
        assert_eq!(time_at_ratio(-1.0, 60_000), 0);
        assert_eq!(time_at_ratio(2.0, 60_000), 60_000);
        assert_eq!(time_at_ratio(f64::NAN, 60_000), 0);
    }

    #[test]
    fn test_render_strip() {
        let markers = vec![
            Marker::new(MarkerType::Serve, 0),
            Marker::new(MarkerType::HomePoint, 5_000),
            Marker::new(MarkerType::AwayPoint, 10_000),
        ];
        assert_eq!(render_strip(&markers, 10_000, 10, None), "S----H---A");
        assert_eq!(
            render_strip(&markers, 10_000, 10, Some(2_000)),
            "S-|--H---A"
        );
        assert_eq!(render_strip(&markers, 10_000, 0, None), "");
    }
}
