//! List markers.

use std::path::PathBuf;

use rallymark_common::clock::format_clock;

use super::load_match;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let markers = project.markers.snapshot();

    if markers.is_empty() {
        println!("No markers yet.");
        return Ok(());
    }

    for marker in &markers {
        println!(
            "  {:>12}  {}",
            format_clock(marker.timestamp_ms),
            marker.list_label()
        );
    }
    println!("\n{} marker(s)", markers.len());
    Ok(())
}
