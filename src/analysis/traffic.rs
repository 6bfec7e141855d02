//! Traffic density around a target position
//!
//! The store hands in every position observed in the trailing window and
//! bounding box; this module reduces that to distinct other-vessel MMSIs
//! and a fixed three-level congestion classification.

use crate::types::{CongestionLevel, PositionRecord, TrafficSnapshot};
use std::collections::HashSet;

/// Trailing window for nearby-traffic evaluation (minutes).
pub const TRAFFIC_WINDOW_MINUTES: i64 = 30;

/// Default proximity radius for the traffic bounding box (nautical miles).
pub const DEFAULT_TRAFFIC_RADIUS_NM: f64 = 10.0;

/// Reduce windowed nearby positions to a traffic snapshot.
///
/// `nearby` is expected to be pre-filtered by time window and bounding box.
/// The target vessel's own reports are excluded from the count; multiple
/// reports from one vessel count once.
pub fn traffic_snapshot(target_mmsi: u64, nearby: &[PositionRecord]) -> TrafficSnapshot {
    let distinct: HashSet<u64> = nearby
        .iter()
        .map(|r| r.mmsi)
        .filter(|mmsi| *mmsi != target_mmsi)
        .collect();

    let nearby_vessel_count = distinct.len();
    TrafficSnapshot {
        nearby_vessel_count,
        congestion_level: CongestionLevel::from_count(nearby_vessel_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(mmsi: u64) -> PositionRecord {
        PositionRecord {
            mmsi,
            vessel_name: None,
            latitude: 50.9,
            longitude: -1.4,
            speed_over_ground: Some(8.0),
            course_over_ground: Some(45.0),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn counts_distinct_vessels_excluding_target() {
        let nearby = vec![record(1), record(2), record(2), record(99), record(3)];
        let snapshot = traffic_snapshot(99, &nearby);
        assert_eq!(snapshot.nearby_vessel_count, 3);
        assert_eq!(snapshot.congestion_level, CongestionLevel::Low);
    }

    #[test]
    fn congestion_level_follows_count() {
        let nearby: Vec<PositionRecord> = (1..=15).map(record).collect();
        let snapshot = traffic_snapshot(99, &nearby);
        assert_eq!(snapshot.nearby_vessel_count, 15);
        assert_eq!(snapshot.congestion_level, CongestionLevel::High);

        let snapshot = traffic_snapshot(15, &nearby);
        assert_eq!(snapshot.nearby_vessel_count, 14);
        assert_eq!(snapshot.congestion_level, CongestionLevel::Medium);
    }

    #[test]
    fn empty_window_is_low_congestion() {
        let snapshot = traffic_snapshot(99, &[]);
        assert_eq!(snapshot.nearby_vessel_count, 0);
        assert_eq!(snapshot.congestion_level, CongestionLevel::Low);
    }
}
