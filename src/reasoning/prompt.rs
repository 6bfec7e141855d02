//! Prompt composition for delay prediction requests
//!
//! One structured natural-language request per queue item: vessel identity,
//! the position snapshot that fired the trigger, movement statistics, and
//! the traffic snapshot, followed by an explicit instruction to answer as a
//! JSON object with fixed key names. The endpoint is not guaranteed to
//! honor that instruction — see `parsing`.

use crate::analysis::movement::HISTORY_WINDOW_HOURS;
use crate::analysis::traffic::TRAFFIC_WINDOW_MINUTES;
use crate::types::{MovementStats, QueueItem, TrafficSnapshot};

fn fmt_knots(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1} knots"))
}

fn fmt_degrees(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.0} degrees"))
}

/// Build the prediction request for one queue item.
pub fn build_prompt(item: &QueueItem, stats: &MovementStats, traffic: &TrafficSnapshot) -> String {
    let snapshot = &item.position_snapshot;
    let vessel = item.vessel_name.as_deref().unwrap_or("Unknown");

    format!(
        "Task: Predict vessel delay and provide rerouting suggestions based on the data below.\n\
         \n\
         Vessel: {vessel} (MMSI {mmsi})\n\
         Current Position: {lat:.5}, {lon:.5}\n\
         Speed: {speed}\n\
         Course: {course}\n\
         Last Update: {observed_at}\n\
         \n\
         Movement over the last {history_hours} hours ({samples} reports):\n\
         Average Speed: {avg_speed}\n\
         Speed Variation: {speed_variation}\n\
         Significant Course Changes: {course_changes}\n\
         Stationary Periods: {stationary_periods}\n\
         \n\
         Traffic within the last {traffic_minutes} minutes:\n\
         Nearby Vessels: {nearby}\n\
         Congestion Level: {congestion}\n\
         \n\
         Based on this data:\n\
         1. Is the vessel likely to be delayed? If so, by how many minutes?\n\
         2. What is the confidence level of this prediction (low, medium, high)?\n\
         3. What are the potential causes of delay?\n\
         4. Should the vessel consider rerouting? If so, provide a brief suggestion.\n\
         \n\
         Respond in JSON format with keys: delay_minutes, confidence, causes, rerouting_suggestion",
        vessel = vessel,
        mmsi = item.mmsi,
        lat = snapshot.latitude,
        lon = snapshot.longitude,
        speed = fmt_knots(snapshot.speed_over_ground),
        course = fmt_degrees(snapshot.course_over_ground),
        observed_at = snapshot.observed_at.to_rfc3339(),
        history_hours = HISTORY_WINDOW_HOURS,
        samples = stats.sample_count,
        avg_speed = fmt_knots(stats.avg_speed),
        speed_variation = fmt_knots(stats.speed_variation),
        course_changes = stats.course_change_count,
        stationary_periods = stats.stationary_period_count,
        traffic_minutes = TRAFFIC_WINDOW_MINUTES,
        nearby = traffic.nearby_vessel_count,
        congestion = traffic.congestion_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CongestionLevel, PositionRecord};
    use chrono::Utc;

    #[test]
    fn prompt_carries_identity_stats_and_format_instruction() {
        let record = PositionRecord {
            mmsi: 211476060,
            vessel_name: Some("ELBE PILOT".to_string()),
            latitude: 53.54321,
            longitude: 9.98765,
            speed_over_ground: Some(1.2),
            course_over_ground: Some(90.0),
            observed_at: Utc::now(),
        };
        let item = QueueItem::new(record);
        let stats = MovementStats {
            avg_speed: Some(2.5),
            speed_variation: Some(0.8),
            course_change_count: 3,
            stationary_period_count: 1,
            sample_count: 42,
        };
        let traffic = TrafficSnapshot {
            nearby_vessel_count: 7,
            congestion_level: CongestionLevel::Medium,
        };

        let prompt = build_prompt(&item, &stats, &traffic);
        assert!(prompt.contains("ELBE PILOT (MMSI 211476060)"));
        assert!(prompt.contains("Speed: 1.2 knots"));
        assert!(prompt.contains("Average Speed: 2.5 knots"));
        assert!(prompt.contains("Nearby Vessels: 7"));
        assert!(prompt.contains("Congestion Level: Medium"));
        assert!(prompt.contains(
            "Respond in JSON format with keys: delay_minutes, confidence, causes, rerouting_suggestion"
        ));
    }

    #[test]
    fn missing_optionals_render_as_unavailable() {
        let record = PositionRecord {
            mmsi: 1,
            vessel_name: None,
            latitude: 0.0,
            longitude: 0.0,
            speed_over_ground: None,
            course_over_ground: None,
            observed_at: Utc::now(),
        };
        let item = QueueItem::new(record);
        let stats = MovementStats {
            avg_speed: None,
            speed_variation: None,
            course_change_count: 0,
            stationary_period_count: 0,
            sample_count: 1,
        };
        let traffic = TrafficSnapshot {
            nearby_vessel_count: 0,
            congestion_level: CongestionLevel::Low,
        };

        let prompt = build_prompt(&item, &stats, &traffic);
        assert!(prompt.contains("Vessel: Unknown (MMSI 1)"));
        assert!(prompt.contains("Speed: N/A"));
        assert!(prompt.contains("Average Speed: N/A"));
    }
}
