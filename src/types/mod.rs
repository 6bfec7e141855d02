//! Domain types for the vessel delay pipeline
//!
//! Records flow one way: feed messages become [`PositionRecord`]s, slow
//! vessels become [`QueueItem`]s, and the prediction worker turns queue
//! items into [`PredictionRecord`]s. Position and prediction records are
//! immutable once written; only the queue item status lifecycle mutates,
//! and it is monotonic (Pending -> Completed or Pending -> Expired).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nautical-mile to decimal-degree approximation used for bounding boxes.
/// 1 nm ≈ 1 minute of latitude; longitude compression at high latitudes
/// is deliberately ignored (coarse proximity filter, not navigation).
pub const NM_TO_DEG: f64 = 0.01666;

// ============================================================================
// Position Records
// ============================================================================

/// One normalized vessel position report.
///
/// MMSI, latitude, and longitude are always present — the decoder rejects
/// messages without them. Speed and course are reported best-effort by
/// shipboard equipment and may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Maritime Mobile Service Identity (numeric vessel identifier)
    pub mmsi: u64,
    pub vessel_name: Option<String>,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Speed over ground (knots, >= 0)
    pub speed_over_ground: Option<f64>,
    /// Course over ground (degrees, [0, 360))
    pub course_over_ground: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

// ============================================================================
// Prediction Queue
// ============================================================================

/// Queue item status lifecycle.
///
/// Transitions are one-way: a Pending item becomes Completed after a
/// successful prediction save, or Expired once its attempt budget runs out.
/// No item ever returns to Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Pending,
    Completed,
    Expired,
}

impl QueueStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One unit of prediction work, created when the delay trigger fires.
///
/// Carries a snapshot of the position that fired the trigger — the worker
/// never recomputes the triggering state from live data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique id assigned at creation (UUID v4)
    pub id: String,
    pub mmsi: u64,
    pub vessel_name: Option<String>,
    /// Position that fired the trigger, frozen at enqueue time
    pub position_snapshot: PositionRecord,
    pub status: QueueStatus,
    /// Worker passes that have looked at this item without completing it
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Create a pending item from the position report that fired the trigger.
    pub fn new(snapshot: PositionRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mmsi: snapshot.mmsi,
            vessel_name: snapshot.vessel_name.clone(),
            position_snapshot: snapshot,
            status: QueueStatus::Pending,
            attempts: 0,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Derived Statistics
// ============================================================================

/// Movement statistics derived from one vessel's trailing position history.
///
/// Speed fields are `None` when no speed samples exist in the window
/// (sample standard deviation additionally needs at least two samples).
/// Never persisted — recomputed on demand from the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementStats {
    /// Mean speed over ground (knots)
    pub avg_speed: Option<f64>,
    /// Sample standard deviation of speed (knots)
    pub speed_variation: Option<f64>,
    /// Consecutive-sample heading changes exceeding 30° (wraparound-safe)
    pub course_change_count: u32,
    /// Maximal runs below 1.0 knot (rising edges, not qualifying samples)
    pub stationary_period_count: u32,
    /// Number of history samples the stats were computed from
    pub sample_count: usize,
}

/// Three-level congestion classification with fixed boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CongestionLevel {
    /// Fewer than 5 nearby vessels
    Low,
    /// 5 to 14 nearby vessels
    Medium,
    /// 15 or more nearby vessels
    High,
}

impl CongestionLevel {
    /// Classify a nearby-vessel count. Boundaries are fixed, not tunable.
    pub fn from_count(count: usize) -> Self {
        if count < 5 {
            Self::Low
        } else if count < 15 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Snapshot of traffic density around a target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    /// Distinct other-vessel MMSIs seen in the trailing window and box
    pub nearby_vessel_count: usize,
    pub congestion_level: CongestionLevel,
}

// ============================================================================
// Predictions
// ============================================================================

/// A delay prediction produced by one successful worker run.
///
/// Field values are coerced from the untrusted reasoning response:
/// unparseable delay defaults to 0, unparseable confidence to 0.5.
/// Created once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub mmsi: u64,
    pub vessel_name: Option<String>,
    pub predicted_delay_minutes: i64,
    /// Confidence in [0, 1]; textual low/medium/high map to 0.3/0.6/0.9
    pub confidence_score: f64,
    /// Free text assembled from reported causes plus optional rerouting note
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Geometry
// ============================================================================

/// Rectangular lat/lon region for proximity filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box centered on a position with a nautical-mile radius, using the
    /// fixed [`NM_TO_DEG`] approximation.
    pub fn around(latitude: f64, longitude: f64, radius_nm: f64) -> Self {
        let radius_deg = radius_nm * NM_TO_DEG;
        Self {
            min_lat: latitude - radius_deg,
            max_lat: latitude + radius_deg,
            min_lon: longitude - radius_deg,
            max_lon: longitude + radius_deg,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}
