//! Row-store collaborator seam
//!
//! The pipeline treats persistence as a keyed, filterable, appendable store:
//! equality/range filters, descending-timestamp reads, and bounding-box
//! range filters on latitude/longitude. [`VesselStore`] is that seam; the
//! connector and worker only ever talk to the trait, so the sled-backed
//! implementation can be swapped (e.g. for push-based queue sources)
//! without touching pipeline logic.

mod sled_store;

pub use sled_store::SledStore;

use crate::types::{BoundingBox, PositionRecord, PredictionRecord, QueueItem};
use chrono::{DateTime, Utc};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unknown queue item: {0}")]
    UnknownItem(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Backing store for positions, the prediction queue, and predictions.
///
/// Implementations must keep per-vessel position histories ordered by
/// `observed_at` and make queue status transitions monotonic: marking an
/// already-terminal item is a no-op, never an error.
pub trait VesselStore: Send + Sync {
    /// Append one position report to the vessel's history.
    fn insert_position(&self, record: &PositionRecord) -> Result<(), StoreError>;

    /// Trailing history for one vessel, ascending by `observed_at`.
    fn vessel_history(
        &self,
        mmsi: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError>;

    /// All positions observed since `since` that fall inside the box,
    /// across every vessel.
    fn positions_within(
        &self,
        bbox: &BoundingBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<PositionRecord>, StoreError>;

    /// Insert a pending queue item. Duplicate items per vessel are accepted.
    fn enqueue(&self, item: &QueueItem) -> Result<(), StoreError>;

    /// All currently pending items, in indeterminate order.
    fn pending_items(&self) -> Result<Vec<QueueItem>, StoreError>;

    /// Increment the item's attempt counter and return the new count.
    fn record_attempt(&self, item_id: &str) -> Result<u32, StoreError>;

    /// Transition an item to Completed. No-op if already terminal.
    fn mark_completed(&self, item_id: &str) -> Result<(), StoreError>;

    /// Transition an item to Expired. No-op if already terminal.
    fn mark_expired(&self, item_id: &str) -> Result<(), StoreError>;

    /// Persist a delay prediction.
    fn insert_prediction(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Most recent prediction for a vessel created at or after `since`.
    fn latest_prediction(
        &self,
        mmsi: u64,
        since: DateTime<Utc>,
    ) -> Result<Option<PredictionRecord>, StoreError>;
}
