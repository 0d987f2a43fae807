//! Render one frame of a clip with its score overlay.

use std::path::PathBuf;

use rallymark_common::config::AppConfig;
use rallymark_processing_core::plan;
use rallymark_render_engine::{compose_overlays, ExportJob, FfmpegProcessor, MediaProcessor};

use super::load_match;

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    clip: usize,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let project = load_match(&path)?;
    let job = ExportJob::for_project(&project, config, None)?;
    let clips = plan(&project.markers.snapshot())
        .map_err(|e| anyhow::anyhow!("Cannot plan clips: {e}"))?;

    let compositions = compose_overlays(&clips, &job.overlay);
    let composition = clip
        .checked_sub(1)
        .and_then(|index| compositions.get(index))
        .ok_or_else(|| {
            anyhow::anyhow!("No clip #{clip}; the project has {} clip(s)", clips.len())
        })?;

    let output = output
        .unwrap_or_else(|| project.exports_dir().join(format!("preview_{clip:03}.png")));
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut processor = FfmpegProcessor::new();
    processor.open_source(&job.source)?;
    processor.render_preview(&job.source, composition, &output)?;

    println!("Preview of clip #{clip}: {}", composition.text.text);
    println!("  Written to {}", output.display());
    Ok(())
}
