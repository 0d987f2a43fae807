//! Render the highlight video.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use rallymark_common::config::AppConfig;
use rallymark_render_engine::{spawn_export, ExportJob, ExportProgress, ExportStage, FfmpegProcessor};

use super::load_match;

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    scoreboard: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = load_match(&path)?;
    let mut job = ExportJob::for_project(&project, config, output)?;
    if scoreboard.is_some() {
        job.overlay.scoreboard_image = scoreboard;
    }

    let processor = FfmpegProcessor::new();
    if !processor.is_available() {
        return Err(anyhow::anyhow!(
            "ffmpeg and ffprobe must be installed and in PATH"
        ));
    }

    println!("  Source: {}", job.source.display());
    println!("  Output: {}", job.output.display());
    println!(
        "  Encoding: {} ({}, crf {}) @ {}fps",
        job.encoding.video_codec, job.encoding.preset, job.encoding.crf, job.encoding.fps
    );

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| match p.stage {
        ExportStage::Rendering => print!(
            "\r  Progress: {:.1}% ({}/{} clips)  ",
            p.progress * 100.0,
            p.clips_rendered,
            p.total_clips,
        ),
        ExportStage::Concatenating => print!("\r  Joining clips...                    "),
        _ => {}
    });

    let handle = spawn_export(
        job,
        project.markers.snapshot(),
        Box::new(processor),
        Some(progress_cb),
    );

    let cancel = handle.cancel_flag();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n  Cancelling...");
            cancel.store(true, Ordering::SeqCst);
        }
    });
    let result = handle.wait().await;
    interrupt.abort();

    match result {
        Ok(summary) => {
            let teams = &project.project.teams;
            println!("\nExport complete: {}", summary.output.display());
            println!(
                "  {} clip(s), final score {}",
                summary.clips,
                summary.final_score.scoreline(&teams.home, &teams.away)
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Export failed: {e}")),
    }
}
