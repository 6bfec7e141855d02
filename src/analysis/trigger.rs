//! Delay trigger predicate
//!
//! Stateless triage over a single position report. Fires per report with no
//! dedup against existing queue items — duplicate pending items for a slow
//! vessel are expected, and the worker's recent-prediction check absorbs
//! them.

use crate::types::PositionRecord;

/// Speed below which a vessel is flagged for delay prediction (knots).
pub const TRIGGER_SPEED_KNOTS: f64 = 3.0;

/// True iff the report carries a speed and it is strictly below 3.0 knots.
/// A missing speed never triggers.
pub fn should_queue(record: &PositionRecord) -> bool {
    matches!(record.speed_over_ground, Some(sog) if sog < TRIGGER_SPEED_KNOTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record_with_speed(sog: Option<f64>) -> PositionRecord {
        PositionRecord {
            mmsi: 367719770,
            vessel_name: None,
            latitude: 29.7,
            longitude: -95.2,
            speed_over_ground: sog,
            course_over_ground: None,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn slow_vessel_triggers() {
        assert!(should_queue(&record_with_speed(Some(0.0))));
        assert!(should_queue(&record_with_speed(Some(1.2))));
        assert!(should_queue(&record_with_speed(Some(2.9))));
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!should_queue(&record_with_speed(Some(3.0))));
        assert!(!should_queue(&record_with_speed(Some(12.5))));
    }

    #[test]
    fn missing_speed_never_triggers() {
        assert!(!should_queue(&record_with_speed(None)));
    }
}
