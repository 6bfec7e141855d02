//! Sled-backed vessel store
//!
//! Three trees: `positions` and `predictions` use composite
//! `[mmsi BE | timestamp-millis BE]` keys so per-vessel ranges scan in
//! chronological order; `queue` is keyed by item id with JSON values.
//! Writes rely on sled's background flushing — on crash the last few
//! writes may be lost, which the at-least-once queue semantics absorb.

use super::{StoreError, VesselStore};
use crate::types::{BoundingBox, PositionRecord, PredictionRecord, QueueItem, QueueStatus};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::debug;

const POSITIONS_TREE: &str = "positions";
const QUEUE_TREE: &str = "queue";
const PREDICTIONS_TREE: &str = "predictions";

/// Sled-backed implementation of [`VesselStore`].
#[derive(Clone)]
pub struct SledStore {
    positions: sled::Tree,
    queue: sled::Tree,
    predictions: sled::Tree,
    // Keeps the database handle alive for the trees' lifetime.
    _db: sled::Db,
}

impl SledStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            positions: db.open_tree(POSITIONS_TREE)?,
            queue: db.open_tree(QUEUE_TREE)?,
            predictions: db.open_tree(PREDICTIONS_TREE)?,
            _db: db,
        })
    }

    /// Composite key: MMSI then timestamp, both big-endian for range scans.
    fn timeline_key(mmsi: u64, at: DateTime<Utc>) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[..8].copy_from_slice(&mmsi.to_be_bytes());
        let millis = at.timestamp_millis().max(0) as u64;
        key[8..].copy_from_slice(&millis.to_be_bytes());
        key
    }

    fn vessel_range(mmsi: u64, since: DateTime<Utc>) -> ([u8; 16], [u8; 16]) {
        let start = Self::timeline_key(mmsi, since);
        let mut end = [0u8; 16];
        end[..8].copy_from_slice(&mmsi.to_be_bytes());
        end[8..].copy_from_slice(&u64::MAX.to_be_bytes());
        (start, end)
    }

    fn load_item(&self, item_id: &str) -> Result<QueueItem, StoreError> {
        let bytes = self
            .queue
            .get(item_id.as_bytes())?
            .ok_or_else(|| StoreError::UnknownItem(item_id.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_item(&self, item: &QueueItem) -> Result<(), StoreError> {
        let value = serde_json::to_vec(item)?;
        self.queue.insert(item.id.as_bytes(), value)?;
        Ok(())
    }

    /// Monotonic status transition: terminal items are left untouched.
    fn transition(&self, item_id: &str, status: QueueStatus) -> Result<(), StoreError> {
        let mut item = self.load_item(item_id)?;
        if item.status.is_terminal() {
            debug!(item_id, ?status, "Queue item already terminal, skipping transition");
            return Ok(());
        }
        item.status = status;
        self.save_item(&item)
    }
}

impl VesselStore for SledStore {
    fn insert_position(&self, record: &PositionRecord) -> Result<(), StoreError> {
        let key = Self::timeline_key(record.mmsi, record.observed_at);
        let value = serde_json::to_vec(record)?;
        self.positions.insert(key, value)?;
        Ok(())
    }

    fn vessel_history(
        &self,
        mmsi: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        let (start, end) = Self::vessel_range(mmsi, since);
        let mut history = Vec::new();
        for entry in self.positions.range(start..=end) {
            let (_key, value) = entry?;
            history.push(serde_json::from_slice(&value)?);
        }
        Ok(history)
    }

    fn positions_within(
        &self,
        bbox: &BoundingBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        // Full scan filtered by window and box. Fine at the scale of a
        // subscribed vessel set; the trait seam allows a spatial index later.
        let mut matches = Vec::new();
        for entry in self.positions.iter() {
            let (_key, value) = entry?;
            let record: PositionRecord = serde_json::from_slice(&value)?;
            if record.observed_at >= since && bbox.contains(record.latitude, record.longitude) {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    fn enqueue(&self, item: &QueueItem) -> Result<(), StoreError> {
        self.save_item(item)?;
        debug!(item_id = %item.id, mmsi = item.mmsi, "Queue item stored");
        Ok(())
    }

    fn pending_items(&self) -> Result<Vec<QueueItem>, StoreError> {
        let mut pending = Vec::new();
        for entry in self.queue.iter() {
            let (_key, value) = entry?;
            let item: QueueItem = serde_json::from_slice(&value)?;
            if item.status == QueueStatus::Pending {
                pending.push(item);
            }
        }
        Ok(pending)
    }

    fn record_attempt(&self, item_id: &str) -> Result<u32, StoreError> {
        let mut item = self.load_item(item_id)?;
        item.attempts += 1;
        let attempts = item.attempts;
        self.save_item(&item)?;
        Ok(attempts)
    }

    fn mark_completed(&self, item_id: &str) -> Result<(), StoreError> {
        self.transition(item_id, QueueStatus::Completed)
    }

    fn mark_expired(&self, item_id: &str) -> Result<(), StoreError> {
        self.transition(item_id, QueueStatus::Expired)
    }

    fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError> {
        let key = Self::timeline_key(record.mmsi, record.created_at);
        let value = serde_json::to_vec(record)?;
        self.predictions.insert(key, value)?;
        Ok(())
    }

    fn latest_prediction(
        &self,
        mmsi: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<PredictionRecord>, StoreError> {
        let (start, end) = Self::vessel_range(mmsi, since);
        match self.predictions.range(start..=end).next_back() {
            Some(entry) => {
                let (_key, value) = entry?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn open_store() -> (tempfile::TempDir, SledStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SledStore::open(tmp.path().join("store")).unwrap();
        (tmp, store)
    }

    fn position(mmsi: u64, minutes_ago: i64, sog: f64) -> PositionRecord {
        PositionRecord {
            mmsi,
            vessel_name: Some("TEST VESSEL".to_string()),
            latitude: 50.9,
            longitude: -1.4,
            speed_over_ground: Some(sog),
            course_over_ground: Some(180.0),
            observed_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn history_is_ascending_and_windowed() {
        let (_tmp, store) = open_store();
        store.insert_position(&position(1, 90, 4.0)).unwrap();
        store.insert_position(&position(1, 10, 2.0)).unwrap();
        store.insert_position(&position(1, 30, 3.0)).unwrap();
        store.insert_position(&position(2, 5, 9.0)).unwrap();

        let history = store
            .vessel_history(1, Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].observed_at < history[1].observed_at);
        assert_eq!(history[0].speed_over_ground, Some(3.0));
        assert_eq!(history[1].speed_over_ground, Some(2.0));
    }

    #[test]
    fn positions_within_filters_box_and_window() {
        let (_tmp, store) = open_store();
        store.insert_position(&position(1, 5, 4.0)).unwrap();
        let mut far = position(2, 5, 4.0);
        far.latitude = 10.0;
        store.insert_position(&far).unwrap();
        store.insert_position(&position(3, 120, 4.0)).unwrap();

        let bbox = BoundingBox::around(50.9, -1.4, 10.0);
        let nearby = store
            .positions_within(&bbox, Utc::now() - Duration::minutes(30))
            .unwrap();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].mmsi, 1);
    }

    #[test]
    fn completed_transition_is_monotonic() {
        let (_tmp, store) = open_store();
        let item = QueueItem::new(position(1, 0, 1.2));
        store.enqueue(&item).unwrap();
        assert_eq!(store.pending_items().unwrap().len(), 1);

        store.mark_completed(&item.id).unwrap();
        assert!(store.pending_items().unwrap().is_empty());

        // Second transition is a no-op, not an error, and cannot revive.
        store.mark_completed(&item.id).unwrap();
        store.mark_expired(&item.id).unwrap();
        let stored = store.load_item(&item.id).unwrap();
        assert_eq!(stored.status, QueueStatus::Completed);
    }

    #[test]
    fn attempts_accumulate() {
        let (_tmp, store) = open_store();
        let item = QueueItem::new(position(1, 0, 1.2));
        store.enqueue(&item).unwrap();
        assert_eq!(store.record_attempt(&item.id).unwrap(), 1);
        assert_eq!(store.record_attempt(&item.id).unwrap(), 2);
    }

    #[test]
    fn unknown_item_is_an_error() {
        let (_tmp, store) = open_store();
        assert!(matches!(
            store.mark_completed("missing"),
            Err(StoreError::UnknownItem(_))
        ));
    }

    #[test]
    fn latest_prediction_respects_window() {
        let (_tmp, store) = open_store();
        let old = PredictionRecord {
            mmsi: 1,
            vessel_name: None,
            predicted_delay_minutes: 30,
            confidence_score: 0.6,
            reasoning: "Causes: old congestion".to_string(),
            created_at: Utc::now() - Duration::hours(3),
        };
        store.insert_prediction(&old).unwrap();

        let since = Utc::now() - Duration::hours(1);
        assert!(store.latest_prediction(1, since).unwrap().is_none());

        let fresh = PredictionRecord {
            created_at: Utc::now(),
            predicted_delay_minutes: 45,
            ..old.clone()
        };
        store.insert_prediction(&fresh).unwrap();
        let found = store.latest_prediction(1, since).unwrap().unwrap();
        assert_eq!(found.predicted_delay_minutes, 45);
        assert!(store.latest_prediction(2, since).unwrap().is_none());
    }
}
