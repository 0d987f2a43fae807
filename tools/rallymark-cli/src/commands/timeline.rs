//! Draw the marker timeline.

use std::path::PathBuf;

use rallymark_common::clock::{format_clock, parse_timestamp};
use rallymark_playback::timeline::{glyph, render_strip};
use rallymark_project_model::marker::MarkerType;

use super::load_match;

pub fn run(path: PathBuf, width: usize, at: Option<String>) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let markers = project.markers.snapshot();
    let playhead = at.as_deref().map(parse_timestamp).transpose()?;

    // Without a probed duration, stretch the strip to the last marker.
    let duration = project
        .markers
        .duration_ms()
        .or_else(|| markers.last().map(|m| m.timestamp_ms))
        .unwrap_or_default()
        .max(playhead.unwrap_or_default());

    println!("[{}]", render_strip(&markers, duration, width.max(1), playhead));
    println!("0{:>width$}", format_clock(duration), width = width.max(1) + 1);
    println!();
    for marker_type in MarkerType::ALL {
        println!(
            "  {} {} ({})",
            glyph(marker_type),
            marker_type.label(),
            marker_type.color()
        );
    }
    Ok(())
}
