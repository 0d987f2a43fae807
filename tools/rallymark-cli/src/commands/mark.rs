//! Add a single marker.

use std::path::PathBuf;

use rallymark_common::clock::parse_timestamp;

use super::{load_match, parse_marker_type};

pub fn run(path: PathBuf, marker_type: String, time: String) -> anyhow::Result<()> {
    let mut project = load_match(&path)?;
    let marker_type = parse_marker_type(&marker_type)?;
    let requested = parse_timestamp(&time)?;

    let stored = project.markers.add(marker_type, requested);
    if stored != requested {
        println!(
            "Note: {} is past the end of the media, clamped to {}",
            rallymark_common::clock::format_secs(requested),
            rallymark_common::clock::format_secs(stored)
        );
    }
    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    let marker = project
        .markers
        .get(stored)
        .ok_or_else(|| anyhow::anyhow!("Marker missing after insert"))?;
    println!("Added: {}", marker.list_label());
    Ok(())
}
