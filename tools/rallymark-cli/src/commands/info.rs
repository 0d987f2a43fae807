//! Show project information.

use std::path::PathBuf;

use rallymark_common::clock::format_clock;
use rallymark_processing_core::{plan, score_at};
use rallymark_project_model::marker::MarkerType;

use super::load_match;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let p = &project.project;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!("  Teams: {} vs {}", p.teams.home, p.teams.away);
    println!();

    println!("Source:");
    match (&p.source, project.source_path()) {
        (Some(source), Some(resolved)) => {
            println!("  Path: {}", resolved.display());
            match source.duration_ms {
                Some(ms) => println!("  Duration: {}", format_clock(ms)),
                None => println!("  Duration: unknown"),
            }
        }
        _ => println!("  (none)"),
    }
    println!();

    let markers = project.markers.snapshot();
    println!("Markers: {}", markers.len());
    for marker_type in MarkerType::ALL {
        let count = markers
            .iter()
            .filter(|m| m.marker_type == marker_type)
            .count();
        println!("  {}: {}", marker_type.label(), count);
    }
    println!();

    match plan(&markers) {
        Ok(clips) => println!("Clips: {}", clips.len()),
        Err(e) => println!("Clips: cannot plan ({e})"),
    }
    let final_score = score_at(&markers, u64::MAX);
    println!(
        "Final score: {}",
        final_score.scoreline(&p.teams.home, &p.teams.away)
    );

    let issues = project.validate_sources();
    if !issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
    }

    Ok(())
}
