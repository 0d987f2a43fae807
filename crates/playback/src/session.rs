//! Tagging session: the command/query surface used while watching a match.
//!
//! The marker store lives behind an `Arc<RwLock<_>>` so an exporter or a
//! second view can read it while the operator keeps tagging. Every mutation
//! publishes one fresh snapshot through a `watch` channel; views subscribe
//! instead of being edited by the store.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use rallymark_project_model::clip::ScoreState;
use rallymark_project_model::marker::{Marker, MarkerStore, MarkerType, TimestampMs};

use crate::backend::PlaybackBackend;

/// Default step for "jump back".
pub const DEFAULT_SEEK_BACK_MS: TimestampMs = 5_000;

pub struct TaggingSession<B: PlaybackBackend> {
    backend: B,
    store: Arc<RwLock<MarkerStore>>,
    snapshots: watch::Sender<Vec<Marker>>,
    seek_back_ms: TimestampMs,
}

impl<B: PlaybackBackend> TaggingSession<B> {
    pub fn new(backend: B, store: MarkerStore) -> Self {
        let (snapshots, _) = watch::channel(store.snapshot());
        Self {
            backend,
            store: Arc::new(RwLock::new(store)),
            snapshots,
            seek_back_ms: DEFAULT_SEEK_BACK_MS,
        }
    }

    pub fn with_seek_back(mut self, step_ms: TimestampMs) -> Self {
        self.seek_back_ms = step_ms;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<RwLock<MarkerStore>> {
        Arc::clone(&self.store)
    }

    /// Receive a new snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Marker>> {
        self.snapshots.subscribe()
    }

    /// Tag the current playhead position.
    pub fn tag(&self, marker_type: MarkerType) -> Marker {
        let at = self.backend.current_time_ms();
        self.add(marker_type, at)
    }

    /// Add or overwrite a marker at an explicit time.
    pub fn add(&self, marker_type: MarkerType, timestamp_ms: TimestampMs) -> Marker {
        let stored = self.mutate(|store| store.add(marker_type, timestamp_ms));
        let marker = Marker::new(marker_type, stored);
        tracing::info!(marker = %marker.list_label(), "Marker added");
        marker
    }

    pub fn remove(&self, timestamp_ms: TimestampMs) -> Option<Marker> {
        let removed = self.mutate(|store| store.remove(timestamp_ms));
        if let Some(marker) = removed {
            tracing::info!(marker = %marker.list_label(), "Marker removed");
        }
        removed
    }

    /// Remove several markers in one step. Subscribers see a single update.
    pub fn remove_set<I>(&self, timestamps: I) -> usize
    where
        I: IntoIterator<Item = TimestampMs>,
    {
        let removed = self.mutate(|store| store.remove_set(timestamps));
        tracing::info!(removed, "Markers removed");
        removed
    }

    /// Remove the nearest marker at or before the playhead.
    pub fn untag_at_playhead(&self) -> Option<Marker> {
        let at = self.backend.current_time_ms();
        let removed = self.mutate(|store| {
            let target = store.marker_before(at)?;
            store.remove(target.timestamp_ms)
        });
        if let Some(marker) = removed {
            tracing::info!(marker = %marker.list_label(), "Marker removed");
        }
        removed
    }

    /// Seek playback to a marker's timestamp.
    pub fn jump_to(&mut self, timestamp_ms: TimestampMs) {
        self.backend.seek(timestamp_ms);
    }

    /// Step the playhead back by the configured amount, stopping at zero.
    pub fn back(&mut self) -> TimestampMs {
        let target = self
            .backend
            .current_time_ms()
            .saturating_sub(self.seek_back_ms);
        self.backend.seek(target);
        self.backend.current_time_ms()
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.read().snapshot()
    }

    /// Score as of the playhead.
    pub fn score_now(&self) -> ScoreState {
        let at = self.backend.current_time_ms();
        rallymark_processing_core::score_at(&self.snapshot(), at)
    }

    /// Push the backend's duration into the store once it is known.
    /// Returns how many markers were clamped, or `None` if still unknown.
    pub fn sync_duration(&self) -> Option<usize> {
        let duration = self.backend.duration_ms()?;
        if self.read().duration_ms() == Some(duration) {
            return Some(0);
        }
        let clamped = self.mutate(|store| store.set_duration(duration));
        if clamped > 0 {
            tracing::warn!(clamped, duration_ms = duration, "Markers clamped to media duration");
        }
        Some(clamped)
    }

    /// Clone of the store for saving.
    pub fn store_snapshot(&self) -> MarkerStore {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, MarkerStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MarkerStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation and publish the result while still holding the lock.
    fn mutate<R>(&self, f: impl FnOnce(&mut MarkerStore) -> R) -> R {
        let mut store = self.write();
        let revision = store.revision();
        let result = f(&mut *store);
        if store.revision() != revision {
            self.snapshots.send_replace(store.snapshot());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessPlayer;
    use crate::duration::DurationWatch;

    fn session() -> TaggingSession<HeadlessPlayer> {
        TaggingSession::new(HeadlessPlayer::new(), MarkerStore::new())
    }

    #[test]
    fn test_tag_uses_playhead() {
        let mut session = session();
        session.jump_to(12_345);
        let marker = session.tag(MarkerType::Serve);
        assert_eq!(marker, Marker::new(MarkerType::Serve, 12_345));
        assert_eq!(session.snapshot(), vec![marker]);
    }

    #[test]
    fn test_subscribers_see_each_mutation() {
        let session = session();
        let mut rx = session.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        session.add(MarkerType::Serve, 1_000);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        // Removing a missing marker publishes nothing.
        session.remove(99_999);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_remove_set_publishes_once() {
        let session = session();
        for ts in [1_000, 2_000, 3_000] {
            session.add(MarkerType::NoPoint, ts);
        }
        let mut rx = session.subscribe();
        let _ = rx.borrow_and_update();

        assert_eq!(session.remove_set([1_000, 3_000, 5_000]), 2);
        assert_eq!(
            *rx.borrow_and_update(),
            vec![Marker::new(MarkerType::NoPoint, 2_000)]
        );
    }

    #[test]
    fn test_untag_at_playhead_removes_nearest_earlier() {
        let mut session = session();
        session.add(MarkerType::Serve, 1_000);
        session.add(MarkerType::HomePoint, 4_000);
        session.jump_to(3_500);

        let removed = session.untag_at_playhead().unwrap();
        assert_eq!(removed.timestamp_ms, 1_000);
        assert_eq!(session.snapshot().len(), 1);

        session.jump_to(500);
        assert!(session.untag_at_playhead().is_none());
    }

    #[test]
    fn test_back_steps_and_floors_at_zero() {
        let mut session = session().with_seek_back(5_000);
        session.jump_to(12_000);
        assert_eq!(session.back(), 7_000);
        assert_eq!(session.back(), 2_000);
        assert_eq!(session.back(), 0);
    }

    #[test]
    fn test_score_now_counts_points_before_playhead() {
        let mut session = session();
        session.add(MarkerType::Serve, 0);
        session.add(MarkerType::HomePoint, 5_000);
        session.add(MarkerType::Serve, 6_000);
        session.add(MarkerType::AwayPoint, 9_000);

        session.jump_to(5_000);
        assert_eq!(session.score_now(), ScoreState::ZERO);
        session.jump_to(9_001);
        assert_eq!(session.score_now(), ScoreState::new(1, 1));
    }

    #[test]
    fn test_sync_duration_clamps_store() {
        let player = HeadlessPlayer::new().with_duration(DurationWatch::ready(10_000));
        let session = TaggingSession::new(player, MarkerStore::new());
        // Tagged before the duration reached the store.
        session.add(MarkerType::Serve, 15_000);

        assert_eq!(session.sync_duration(), Some(1));
        assert_eq!(session.sync_duration(), Some(0));
        assert_eq!(
            session.snapshot(),
            vec![Marker::new(MarkerType::Serve, 10_000)]
        );
    }

    #[test]
    fn test_store_is_shared_with_readers() {
        let session = session();
        let shared = session.store();
        session.add(MarkerType::AwayPoint, 2_000);
        assert_eq!(shared.read().unwrap().len(), 1);
    }
}
