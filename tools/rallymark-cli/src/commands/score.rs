//! Score at a point in the match.

use std::path::PathBuf;

use rallymark_common::clock::{format_clock, parse_timestamp};
use rallymark_processing_core::score_at;

use super::load_match;

pub fn run(path: PathBuf, time: String) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let at = parse_timestamp(&time)?;
    let score = score_at(&project.markers.snapshot(), at);
    let teams = &project.project.teams;

    println!(
        "At {}: {}",
        format_clock(at),
        score.scoreline(&teams.home, &teams.away)
    );
    Ok(())
}
