//! Remove markers.

use std::path::PathBuf;

use rallymark_common::clock::parse_timestamp;

use super::load_match;

pub fn run(path: PathBuf, times: Vec<String>) -> anyhow::Result<()> {
    let mut project = load_match(&path)?;
    let timestamps = times
        .iter()
        .map(|t| parse_timestamp(t))
        .collect::<Result<Vec<_>, _>>()?;

    let removed = project.markers.remove_set(timestamps.iter().copied());
    if removed > 0 {
        project.project.touch();
        project
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;
    }

    println!("Removed {removed} of {} marker(s).", timestamps.len());
    Ok(())
}
