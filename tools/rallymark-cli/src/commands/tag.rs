//! Interactive tagging session.
//!
//! Reads one command per line from stdin while a headless playhead runs.
//! Markers are written to `meta/markers.json` after every change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::io::{AsyncBufReadExt, BufReader};

use rallymark_common::clock::{format_clock, parse_timestamp};
use rallymark_common::config::AppConfig;
use rallymark_playback::timeline::render_strip;
use rallymark_playback::{
    DurationWatch, FfprobeDuration, HeadlessPlayer, PlaybackBackend, TaggingSession,
};
use rallymark_project_model::marker::MarkerStore;
use rallymark_project_model::project::Teams;

use super::{load_match, parse_marker_type};

const TIMELINE_WIDTH: usize = 72;

enum Flow {
    Continue,
    Quit,
}

pub async fn run(config: &AppConfig, path: PathBuf) -> anyhow::Result<()> {
    let mut project = load_match(&path)?;
    let source = project
        .source_path()
        .ok_or_else(|| anyhow::anyhow!("Project has no source media attached"))?;

    let duration = match project.markers.duration_ms() {
        Some(ms) => DurationWatch::ready(ms),
        None => DurationWatch::spawn(Arc::new(FfprobeDuration), source.clone()),
    };
    let mut player = HeadlessPlayer::new().with_duration(duration);
    player.open(&source)?;

    let mut session = TaggingSession::new(player, project.markers.clone())
        .with_seek_back(config.playback.seek_back_ms);
    let autosave = spawn_autosave(&session, project.markers_path());
    let teams = project.project.teams.clone();

    println!("Tagging {}", source.display());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        session.sync_duration();
        match handle(&mut session, &teams, line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => println!("  {e}"),
        }
    }

    stop_autosave(autosave).await;
    session.sync_duration();
    project.markers = session.store_snapshot();
    if let Some(duration) = session.backend().duration_ms() {
        project.set_duration(duration);
    }
    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;

    println!(
        "Saved {} marker(s) to {}",
        project.markers.len(),
        project.markers_path().display()
    );
    Ok(())
}

fn handle(
    session: &mut TaggingSession<HeadlessPlayer>,
    teams: &Teams,
    input: &str,
) -> anyhow::Result<Flow> {
    let (command, arg) = input
        .split_once(' ')
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((input, ""));

    match command {
        "" => {}
        "p" => {
            session.backend_mut().toggle();
            let state = if session.backend().is_playing() {
                "Playing"
            } else {
                "Paused"
            };
            println!("  {state} at {}", format_clock(session.backend().current_time_ms()));
        }
        "s" | "h" | "a" | "n" => {
            let marker = session.tag(parse_marker_type(command)?);
            println!("  + {}", marker.list_label());
        }
        "d" => match session.untag_at_playhead() {
            Some(marker) => println!("  - {}", marker.list_label()),
            None => println!("  No marker at or before the playhead"),
        },
        "b" => {
            let at = session.back();
            println!("  Back to {}", format_clock(at));
        }
        "j" => {
            let at = parse_timestamp(arg)?;
            session.jump_to(at);
            println!("  Jumped to {}", format_clock(session.backend().current_time_ms()));
        }
        "l" => {
            for marker in session.snapshot() {
                println!("  {:>12}  {}", format_clock(marker.timestamp_ms), marker.list_label());
            }
        }
        "t" => {
            let markers = session.snapshot();
            let now = session.backend().current_time_ms();
            let duration = session
                .backend()
                .duration_ms()
                .or_else(|| markers.last().map(|m| m.timestamp_ms))
                .unwrap_or_default()
                .max(now);
            println!("  [{}]", render_strip(&markers, duration, TIMELINE_WIDTH, Some(now)));
        }
        "c" => {
            let score = session.score_now();
            println!(
                "  {} at {}",
                score.scoreline(&teams.home, &teams.away),
                format_clock(session.backend().current_time_ms())
            );
        }
        "q" => return Ok(Flow::Quit),
        "?" | "help" => print_help(),
        other => anyhow::bail!("Unknown command '{other}' (? for help)"),
    }
    Ok(Flow::Continue)
}

fn print_help() {
    println!("Commands (one per line):");
    println!("  p          play / pause");
    println!("  s h a n    tag serve / home point / away point / no point");
    println!("  d          delete the nearest marker at or before the playhead");
    println!("  b          jump back");
    println!("  j <time>   jump to a time (12.5s, 1:02.5, ...)");
    println!("  l          list markers");
    println!("  t          show the timeline");
    println!("  c          current score");
    println!("  q          save and quit");
}

/// Persist every published snapshot as it arrives.
fn spawn_autosave(
    session: &TaggingSession<HeadlessPlayer>,
    path: PathBuf,
) -> tokio::task::JoinHandle<()> {
    let mut rx = session.subscribe();
    let store = session.store();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            save_markers(&store, &path);
        }
    })
}

/// Abort the autosave task and wait for any write already in progress.
async fn stop_autosave(autosave: tokio::task::JoinHandle<()>) {
    autosave.abort();
    if let Err(e) = autosave.await {
        if !e.is_cancelled() {
            tracing::warn!(error = %e, "Autosave task ended abnormally");
        }
    }
}

fn save_markers(store: &RwLock<MarkerStore>, path: &Path) {
    let snapshot = match store.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    match snapshot.save_file(path) {
        Ok(()) => tracing::debug!(markers = snapshot.len(), "Markers autosaved"),
        Err(e) => tracing::warn!(error = %e, "Autosave failed"),
    }
}
