//! Media playback contract.
//!
//! Tagging only needs a handful of things from a player: open a file,
//! play/pause, report the playhead, and seek. Any real video backend can sit
//! behind [`PlaybackBackend`]; [`HeadlessPlayer`] is a clock-driven playhead
//! for terminals and tests.

use std::path::{Path, PathBuf};

use rallymark_common::clock::MonotonicClock;
use rallymark_common::error::{RallymarkError, RallymarkResult};
use rallymark_project_model::marker::TimestampMs;

use crate::duration::DurationWatch;

/// Trait that all playback backends must implement.
pub trait PlaybackBackend: Send {
    /// Load a media file. Playback starts paused at zero.
    fn open(&mut self, path: &Path) -> RallymarkResult<()>;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Current playhead position in milliseconds.
    fn current_time_ms(&self) -> TimestampMs;

    /// Move the playhead. Positions past a known duration are clamped.
    fn seek(&mut self, position_ms: TimestampMs);

    /// Media length, once known.
    fn duration_ms(&self) -> Option<TimestampMs>;

    /// Flip between playing and paused.
    fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }
}

/// A playhead that advances with wall time while "playing".
#[derive(Debug, Default)]
pub struct HeadlessPlayer {
    source: Option<PathBuf>,
    anchor_ms: TimestampMs,
    running: Option<MonotonicClock>,
    duration: Option<DurationWatch>,
}

impl HeadlessPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a duration that may still be resolving.
    pub fn with_duration(mut self, duration: DurationWatch) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn set_duration(&mut self, duration: DurationWatch) {
        self.duration = Some(duration);
    }

    /// The currently opened file.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn clamp(&self, position_ms: TimestampMs) -> TimestampMs {
        match self.duration_ms() {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        }
    }
}

impl PlaybackBackend for HeadlessPlayer {
    fn open(&mut self, path: &Path) -> RallymarkResult<()> {
        if !path.exists() {
            return Err(RallymarkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::info!(path = %path.display(), "Opened media");
        self.source = Some(path.to_path_buf());
        self.anchor_ms = 0;
        self.running = None;
        Ok(())
    }

    fn play(&mut self) {
        if self.running.is_none() {
            self.running = Some(MonotonicClock::start());
            tracing::debug!(position_ms = self.anchor_ms, "Playback started");
        }
    }

    fn pause(&mut self) {
        if self.running.is_some() {
            self.anchor_ms = self.current_time_ms();
            self.running = None;
            tracing::debug!(position_ms = self.anchor_ms, "Playback paused");
        }
    }

    fn is_playing(&self) -> bool {
        self.running.is_some()
    }

    fn current_time_ms(&self) -> TimestampMs {
        let elapsed = self.running.as_ref().map_or(0, MonotonicClock::elapsed_ms);
        self.clamp(self.anchor_ms.saturating_add(elapsed))
    }

    fn seek(&mut self, position_ms: TimestampMs) {
        self.anchor_ms = self.clamp(position_ms);
        if self.running.is_some() {
            self.running = Some(MonotonicClock::start());
        }
        tracing::debug!(position_ms = self.anchor_ms, "Seek");
    }

    fn duration_ms(&self) -> Option<TimestampMs> {
        self.duration.as_ref().and_then(DurationWatch::current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_open_missing_file_fails() {
        let mut player = HeadlessPlayer::new();
        let err = player
            .open(Path::new("/definitely/not/here.mp4"))
            .unwrap_err();
        assert!(matches!(err, RallymarkError::FileNotFound { .. }));
        assert!(player.source().is_none());
    }

    #[test]
    fn test_paused_playhead_is_stationary() {
        let mut player = HeadlessPlayer::new();
        player.seek(12_000);
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(player.current_time_ms(), 12_000);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_playing_advances_and_pause_freezes() {
        let mut player = HeadlessPlayer::new();
        player.seek(1_000);
        player.play();
        std::thread::sleep(Duration::from_millis(30));
        player.pause();

        let frozen = player.current_time_ms();
        assert!(frozen >= 1_030, "playhead at {frozen}");
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(player.current_time_ms(), frozen);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut player = HeadlessPlayer::new().with_duration(DurationWatch::ready(60_000));
        player.seek(90_000);
        assert_eq!(player.current_time_ms(), 60_000);
        player.seek(0);
        assert_eq!(player.current_time_ms(), 0);
    }

    #[test]
    fn test_toggle() {
        let mut player = HeadlessPlayer::new();
        player.toggle();
        assert!(player.is_playing());
        player.toggle();
        assert!(!player.is_playing());
    }
}
