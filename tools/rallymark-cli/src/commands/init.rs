//! Initialize a new match project.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rallymark_common::clock::format_clock;
use rallymark_common::config::AppConfig;
use rallymark_playback::{DurationWatch, FfprobeDuration};
use rallymark_project_model::project::{LoadedMatch, SourceMedia, Teams};

pub async fn run(
    config: &AppConfig,
    name: String,
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    home: Option<String>,
    away: Option<String>,
) -> anyhow::Result<()> {
    let project_dir = output
        .unwrap_or_else(|| config.projects_dir.clone())
        .join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let teams = Teams {
        home: home.unwrap_or_else(|| config.overlay.home_label.clone()),
        away: away.unwrap_or_else(|| config.overlay.away_label.clone()),
    };

    let source = match source {
        Some(path) => {
            let path = std::fs::canonicalize(&path)
                .map_err(|e| anyhow::anyhow!("Cannot open source {}: {e}", path.display()))?;
            let watch = DurationWatch::spawn(Arc::new(FfprobeDuration), path.clone());
            let timeout = Duration::from_millis(config.playback.duration_timeout_ms);
            let duration_ms = match watch.wait_ready(timeout).await {
                Ok(ms) => Some(ms),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not determine media duration");
                    None
                }
            };
            Some(SourceMedia {
                path: path.display().to_string(),
                duration_ms,
            })
        }
        None => None,
    };

    let project = LoadedMatch::create(&project_dir, &name, source, teams)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!(
        "  Teams: {} vs {}",
        project.project.teams.home, project.project.teams.away
    );
    match &project.project.source {
        Some(source) => {
            println!("  Source: {}", source.path);
            match source.duration_ms {
                Some(ms) => println!("  Duration: {}", format_clock(ms)),
                None => println!("  Duration: unknown"),
            }
        }
        None => println!("  Source: none (edit meta/project.json to attach one)"),
    }
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── meta/        (project.json, markers.json)");
    println!("  └── exports/     (rendered highlights)");

    Ok(())
}
