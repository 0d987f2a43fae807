//! Match markers and the timestamp-keyed marker store.
//!
//! A marker tags a single playback instant with a match event. The store
//! holds at most one marker per millisecond; adding at an occupied instant
//! replaces the earlier tag. Snapshots are persisted as a flat JSON object
//! mapping the string-encoded millisecond timestamp to the marker label:
//!
//! ```json
//! {
//!   "1200": "Serve",
//!   "5400": "Home point"
//! }
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Milliseconds from the start of the source media.
pub type TimestampMs = u64;

/// The closed set of match events an operator can tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerType {
    /// Start of a rally.
    #[serde(rename = "Serve")]
    Serve,
    /// Rally ended without a point being awarded.
    #[serde(rename = "No point")]
    NoPoint,
    /// Rally won by the home side.
    #[serde(rename = "Home point")]
    HomePoint,
    /// Rally won by the away side.
    #[serde(rename = "Away point")]
    AwayPoint,
}

impl MarkerType {
    /// Every marker type, in the order the tagging controls present them.
    pub const ALL: [MarkerType; 4] = [
        MarkerType::Serve,
        MarkerType::NoPoint,
        MarkerType::HomePoint,
        MarkerType::AwayPoint,
    ];

    /// Canonical label, used for persistence and display.
    pub fn label(self) -> &'static str {
        match self {
            MarkerType::Serve => "Serve",
            MarkerType::NoPoint => "No point",
            MarkerType::HomePoint => "Home point",
            MarkerType::AwayPoint => "Away point",
        }
    }

    /// Parse a canonical label. Matching is exact.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Colour used when drawing this marker on a timeline strip.
    pub fn color(self) -> &'static str {
        match self {
            MarkerType::Serve => "yellow",
            MarkerType::NoPoint => "grey",
            MarkerType::HomePoint => "green",
            MarkerType::AwayPoint => "red",
        }
    }

    /// Whether this marker closes a rally opened by a serve.
    pub fn is_close(self) -> bool {
        !matches!(self, MarkerType::Serve)
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MarkerType {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| {
            SnapshotError::MalformedSnapshot(format!("unknown marker type '{s}'"))
        })
    }
}

/// A tagged playback instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub marker_type: MarkerType,
    pub timestamp_ms: TimestampMs,
}

impl Marker {
    pub fn new(marker_type: MarkerType, timestamp_ms: TimestampMs) -> Self {
        Self {
            marker_type,
            timestamp_ms,
        }
    }

    /// Timestamp as fractional seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1_000.0
    }

    /// List entry as shown to the operator, e.g. `Serve at 12.34s`.
    pub fn list_label(&self) -> String {
        format!("{} at {:.2}s", self.marker_type, self.timestamp_secs())
    }
}

impl Ord for Marker {
    /// Timestamp ascending, then label as a tie-break.
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then_with(|| self.marker_type.label().cmp(other.marker_type.label()))
    }
}

impl PartialOrd for Marker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered, timestamp-unique marker collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerStore {
    markers: BTreeMap<TimestampMs, Marker>,
    duration_ms: Option<TimestampMs>,
    revision: u64,
}

impl MarkerStore {
    /// Create an empty store with no known media duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store bounded by a known media duration.
    pub fn with_duration(duration_ms: TimestampMs) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            ..Self::default()
        }
    }

    /// Insert or overwrite the marker at `timestamp_ms`.
    ///
    /// Timestamps beyond a known duration are clamped to it. Returns the
    /// timestamp the marker was stored under.
    pub fn add(&mut self, marker_type: MarkerType, timestamp_ms: TimestampMs) -> TimestampMs {
        let at = self.clamp(timestamp_ms);
        self.markers.insert(at, Marker::new(marker_type, at));
        self.revision += 1;
        at
    }

    /// Delete the marker at `timestamp_ms`. Absent keys are not an error.
    pub fn remove(&mut self, timestamp_ms: TimestampMs) -> Option<Marker> {
        let removed = self.markers.remove(&timestamp_ms);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Delete every listed timestamp in one mutation. Returns how many
    /// markers were actually present.
    pub fn remove_set<I>(&mut self, timestamps: I) -> usize
    where
        I: IntoIterator<Item = TimestampMs>,
    {
        let removed = timestamps
            .into_iter()
            .filter(|ts| self.markers.remove(ts).is_some())
            .count();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Markers in ascending timestamp order.
    pub fn snapshot(&self) -> Vec<Marker> {
        self.markers.values().copied().collect()
    }

    /// The marker stored at exactly `timestamp_ms`.
    pub fn get(&self, timestamp_ms: TimestampMs) -> Option<Marker> {
        self.markers.get(&timestamp_ms).copied()
    }

    /// The latest marker at or before `timestamp_ms`.
    pub fn marker_before(&self, timestamp_ms: TimestampMs) -> Option<Marker> {
        self.markers
            .range(..=timestamp_ms)
            .next_back()
            .map(|(_, m)| *m)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Known media duration, if any.
    pub fn duration_ms(&self) -> Option<TimestampMs> {
        self.duration_ms
    }

    /// Monotonic mutation counter for presentation layers that poll.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record the media duration and pull any later markers onto it.
    ///
    /// Out-of-range markers are re-keyed in ascending order, so the latest
    /// one wins the final instant. Returns how many markers were clamped.
    pub fn set_duration(&mut self, duration_ms: TimestampMs) -> usize {
        self.duration_ms = Some(duration_ms);
        let overflow = self.markers.split_off(&duration_ms.saturating_add(1));
        let clamped = overflow.len();
        for marker in overflow.into_values() {
            self.markers.insert(
                duration_ms,
                Marker::new(marker.marker_type, duration_ms),
            );
        }
        if clamped > 0 {
            self.revision += 1;
        }
        clamped
    }

    /// Serialize to the persisted snapshot form.
    pub fn save(&self) -> Result<String, SnapshotError> {
        let document: BTreeMap<TimestampMs, MarkerType> = self
            .markers
            .iter()
            .map(|(ts, m)| (*ts, m.marker_type))
            .collect();
        serde_json::to_string_pretty(&document)
            .map_err(|e| SnapshotError::MalformedSnapshot(e.to_string()))
    }

    /// Replace the store contents from a persisted snapshot.
    ///
    /// Every entry is validated before anything is replaced; on error the
    /// store is left untouched. Returns the number of markers loaded.
    pub fn load(&mut self, serialized: &str) -> Result<usize, SnapshotError> {
        let SnapshotEntries(entries) = serde_json::from_str::<SnapshotEntries>(serialized)
            .map_err(|e| SnapshotError::MalformedSnapshot(format!("invalid snapshot: {e}")))?;

        let mut seen = BTreeSet::new();
        let mut parsed = Vec::with_capacity(entries.len());
        for (key, value) in &entries {
            if !seen.insert(key.as_str()) {
                return Err(SnapshotError::MalformedSnapshot(format!(
                    "timestamp '{key}' appears more than once"
                )));
            }
            let timestamp_ms = parse_snapshot_key(key)?;
            let label = value.as_str().ok_or_else(|| {
                SnapshotError::MalformedSnapshot(format!(
                    "marker at '{key}' must be a string label, found {value}"
                ))
            })?;
            let marker_type: MarkerType = label.parse()?;
            parsed.push(Marker::new(marker_type, timestamp_ms));
        }

        // Re-apply in timestamp order so clamping collisions resolve the
        // same way as `set_duration`.
        parsed.sort();
        let mut markers = BTreeMap::new();
        for marker in parsed {
            let at = self.clamp(marker.timestamp_ms);
            markers.insert(at, Marker::new(marker.marker_type, at));
        }

        let loaded = markers.len();
        self.markers = markers;
        self.revision += 1;
        Ok(loaded)
    }

    /// Load a snapshot file into the store.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load(&content)
    }

    /// Write the store to a snapshot file.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let content = self.save()?;
        std::fs::write(path, content).map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn clamp(&self, timestamp_ms: TimestampMs) -> TimestampMs {
        match self.duration_ms {
            Some(duration) => timestamp_ms.min(duration),
            None => timestamp_ms,
        }
    }
}

/// Raw snapshot entries in document order, duplicates included.
struct SnapshotEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for SnapshotEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> serde::de::Visitor<'de> for EntriesVisitor {
            type Value = SnapshotEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of timestamp -> marker")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(SnapshotEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn parse_snapshot_key(key: &str) -> Result<TimestampMs, SnapshotError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SnapshotError::MalformedSnapshot(format!(
            "timestamp '{key}' is not a non-negative integer"
        )));
    }
    key.parse().map_err(|_| {
        SnapshotError::MalformedSnapshot(format!("timestamp '{key}' is out of range"))
    })
}

/// Errors that can occur when loading or saving marker snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Malformed marker snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<SnapshotError> for rallymark_common::RallymarkError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io { source, .. } => source.into(),
            other => Self::marker(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_add_overwrites_same_instant() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 1_000);
        store.add(MarkerType::HomePoint, 1_000);

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(1_000),
            Some(Marker::new(MarkerType::HomePoint, 1_000))
        );
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 0);
        let revision = store.revision();

        assert!(store.remove(42).is_none());
        assert_eq!(store.revision(), revision);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_set_counts_present_only() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 0);
        store.add(MarkerType::AwayPoint, 800);
        store.add(MarkerType::Serve, 2_000);

        let removed = store.remove_set([0, 2_000, 9_999]);
        assert_eq!(removed, 2);
        assert_eq!(
            store.snapshot(),
            vec![Marker::new(MarkerType::AwayPoint, 800)]
        );
    }

    #[test]
    fn test_marker_before_finds_nearest_earlier() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 1_000);
        store.add(MarkerType::NoPoint, 3_000);

        assert_eq!(store.marker_before(999), None);
        assert_eq!(store.marker_before(1_000).map(|m| m.timestamp_ms), Some(1_000));
        assert_eq!(store.marker_before(2_999).map(|m| m.timestamp_ms), Some(1_000));
        assert_eq!(store.marker_before(10_000).map(|m| m.timestamp_ms), Some(3_000));
    }

    #[test]
    fn test_add_clamps_to_known_duration() {
        let mut store = MarkerStore::with_duration(10_000);
        let at = store.add(MarkerType::HomePoint, 12_500);
        assert_eq!(at, 10_000);
        assert_eq!(store.snapshot()[0].timestamp_ms, 10_000);
    }

    #[test]
    fn test_set_duration_rekeys_overflow_latest_wins() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 4_000);
        store.add(MarkerType::HomePoint, 6_000);
        store.add(MarkerType::AwayPoint, 7_000);

        let clamped = store.set_duration(5_000);
        assert_eq!(clamped, 2);
        assert_eq!(
            store.snapshot(),
            vec![
                Marker::new(MarkerType::Serve, 4_000),
                Marker::new(MarkerType::AwayPoint, 5_000),
            ]
        );
        assert_eq!(store.duration_ms(), Some(5_000));
    }

    #[test]
    fn test_marker_tie_break_uses_label() {
        let mut markers = vec![
            Marker::new(MarkerType::Serve, 100),
            Marker::new(MarkerType::AwayPoint, 100),
            Marker::new(MarkerType::HomePoint, 100),
            Marker::new(MarkerType::NoPoint, 50),
        ];
        markers.sort();

        let order: Vec<_> = markers.iter().map(|m| m.marker_type).collect();
        assert_eq!(
            order,
            vec![
                MarkerType::NoPoint,
                MarkerType::AwayPoint,
                MarkerType::HomePoint,
                MarkerType::Serve,
            ]
        );
    }

    #[test]
    fn test_save_orders_keys_numerically() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::HomePoint, 10_000);
        store.add(MarkerType::Serve, 200);

        let saved = store.save().unwrap();
        let serve_pos = saved.find("\"200\"").unwrap();
        let point_pos = saved.find("\"10000\"").unwrap();
        assert!(serve_pos < point_pos);
        assert!(saved.contains("\"Home point\""));
    }

    #[test]
    fn test_load_accepts_original_tool_output() {
        let raw = r#"{
  "1532": "Serve",
  "8120": "Away point",
  "9050": "Serve",
  "15777": "No point"
}"#;
        let mut store = MarkerStore::new();
        assert_eq!(store.load(raw).unwrap(), 4);
        assert_eq!(
            store.snapshot()[1],
            Marker::new(MarkerType::AwayPoint, 8_120)
        );
    }

    #[test]
    fn test_load_rejects_bad_entries_without_mutation() {
        let mut store = MarkerStore::new();
        store.add(MarkerType::Serve, 1);
        let before = store.clone();

        for bad in [
            r#"{"100": "Serve", "200": "Ace"}"#,
            r#"{"-5": "Serve"}"#,
            r#"{"1.5": "Serve"}"#,
            r#"{"abc": "Serve"}"#,
            r#"{"100": 3}"#,
            r#"{"100": "Ace", "100": "Serve"}"#,
            r#"{"100": "Serve", "100": "Serve"}"#,
            r#"{" 12 ": "Serve"}"#,
            r#"["Serve"]"#,
            "not json",
        ] {
            let err = store.load(bad).unwrap_err();
            assert!(
                matches!(err, SnapshotError::MalformedSnapshot(_)),
                "{bad} should be malformed"
            );
            assert_eq!(store, before, "{bad} must not mutate the store");
        }
    }

    #[test]
    fn test_load_clamps_to_known_duration() {
        let mut store = MarkerStore::with_duration(1_000);
        store.load(r#"{"900": "Serve", "1500": "Home point"}"#).unwrap();
        assert_eq!(
            store.snapshot(),
            vec![
                Marker::new(MarkerType::Serve, 900),
                Marker::new(MarkerType::HomePoint, 1_000),
            ]
        );
    }

    #[test]
    fn test_list_label_matches_marker_list() {
        let marker = Marker::new(MarkerType::NoPoint, 12_345);
        assert_eq!(marker.list_label(), "No point at 12.35s");
    }

    #[test]
    fn test_label_parse_is_exact() {
        assert_eq!("Home point".parse::<MarkerType>().unwrap(), MarkerType::HomePoint);
        assert!("home point".parse::<MarkerType>().is_err());
        assert!(MarkerType::from_label("HOME_PT").is_none());
    }

    fn marker_type_strategy() -> impl Strategy<Value = MarkerType> {
        prop::sample::select(MarkerType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_snapshot_is_sorted_for_any_insertion_order(
            entries in prop::collection::vec((marker_type_strategy(), 0u64..1_000_000), 0..64)
        ) {
            let mut store = MarkerStore::new();
            for (marker_type, ts) in &entries {
                store.add(*marker_type, *ts);
            }
            let snapshot = store.snapshot();
            prop_assert!(snapshot.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));

            let mut distinct: Vec<u64> = entries.iter().map(|(_, ts)| *ts).collect();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(snapshot.len(), distinct.len());
        }

        #[test]
        fn prop_save_load_roundtrip(
            entries in prop::collection::vec((marker_type_strategy(), 0u64..10_000_000), 0..64)
        ) {
            let mut store = MarkerStore::new();
            for (marker_type, ts) in &entries {
                store.add(*marker_type, *ts);
            }
            let saved = store.save().unwrap();

            let mut restored = MarkerStore::new();
            restored.load(&saved).unwrap();
            prop_assert_eq!(restored.snapshot(), store.snapshot());
        }
    }
}
