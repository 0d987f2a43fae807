//! Show the rally clips derived from the markers.

use std::path::PathBuf;

use rallymark_common::clock::format_clock;
use rallymark_processing_core::{plan, running_scores};

use super::load_match;

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let clips = plan(&project.markers.snapshot())
        .map_err(|e| anyhow::anyhow!("Cannot plan clips: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clips)?);
        return Ok(());
    }

    if clips.is_empty() {
        println!("No complete rallies yet.");
        return Ok(());
    }

    let teams = &project.project.teams;
    let total_ms: u64 = clips.iter().map(|c| c.duration_ms()).sum();
    for (index, (clip, score)) in clips.iter().zip(running_scores(&clips)).enumerate() {
        println!(
            "  #{:<3} {} → {}  {:<10}  {}",
            index + 1,
            format_clock(clip.start_ms),
            format_clock(clip.end_ms),
            clip.point_type.label(),
            score.scoreline(&teams.home, &teams.away)
        );
    }
    println!(
        "\n{} clip(s), {} of highlights",
        clips.len(),
        format_clock(total_ms)
    );
    Ok(())
}
