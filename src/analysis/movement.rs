//! Movement statistics over a single vessel's position history
//!
//! Input is the trailing history in ascending `observed_at` order. Course
//! deltas live on a circle: a 350° -> 10° transition is a 20° change, not
//! 340°, so deltas outside (30°, 330°) are not significant changes.
//! Stationary periods count maximal runs below 1.0 knot, not samples.

use crate::types::{MovementStats, PositionRecord};
use statrs::statistics::Statistics;

/// Speed below which a vessel is considered stationary (knots).
pub const STATIONARY_SPEED_KNOTS: f64 = 1.0;

/// Minimum heading delta that counts as a course change (degrees).
pub const COURSE_CHANGE_MIN_DEG: f64 = 30.0;

/// Default trailing history window (hours).
pub const HISTORY_WINDOW_HOURS: i64 = 24;

/// Compute movement statistics from an ascending position history.
///
/// Returns `None` for an empty history — insufficient data is an explicit
/// outcome, never a zeroed-out result. Individual speed fields are `None`
/// when the window holds no speed samples.
pub fn analyze_movement(history: &[PositionRecord]) -> Option<MovementStats> {
    if history.is_empty() {
        return None;
    }

    let speeds: Vec<f64> = history
        .iter()
        .filter_map(|r| r.speed_over_ground)
        .collect();

    let avg_speed = if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().mean())
    };

    // Sample standard deviation needs at least two samples.
    let speed_variation = if speeds.len() >= 2 {
        Some(speeds.iter().std_dev())
    } else {
        None
    };

    Some(MovementStats {
        avg_speed,
        speed_variation,
        course_change_count: count_course_changes(history),
        stationary_period_count: count_stationary_periods(history),
        sample_count: history.len(),
    })
}

/// Count consecutive-sample heading changes exceeding the threshold.
///
/// The raw delta is normalized into [0, 360); values in the open interval
/// (30°, 330°) count. This rejects both near-zero deltas and wraparound
/// artifacts at the 0°/360° boundary. Pairs missing either course are
/// skipped.
fn count_course_changes(history: &[PositionRecord]) -> u32 {
    let mut changes = 0;
    for pair in history.windows(2) {
        let (Some(prev), Some(next)) = (pair[0].course_over_ground, pair[1].course_over_ground)
        else {
            continue;
        };
        let delta = (next - prev).rem_euclid(360.0);
        if delta > COURSE_CHANGE_MIN_DEG && delta < 360.0 - COURSE_CHANGE_MIN_DEG {
            changes += 1;
        }
    }
    changes
}

/// Count transitions *into* the below-1.0-knot state (rising edges).
///
/// A vessel sitting still across ten consecutive samples is one stationary
/// period. Samples without a speed reading are skipped and do not end a run.
fn count_stationary_periods(history: &[PositionRecord]) -> u32 {
    let mut periods = 0;
    let mut in_stationary_run = false;
    for record in history {
        let Some(sog) = record.speed_over_ground else {
            continue;
        };
        let below = sog < STATIONARY_SPEED_KNOTS;
        if below && !in_stationary_run {
            periods += 1;
        }
        in_stationary_run = below;
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn history_from(samples: &[(Option<f64>, Option<f64>)]) -> Vec<PositionRecord> {
        let base = Utc::now() - Duration::hours(1);
        samples
            .iter()
            .enumerate()
            .map(|(i, (sog, cog))| PositionRecord {
                mmsi: 211476060,
                vessel_name: None,
                latitude: 53.5,
                longitude: 9.9,
                speed_over_ground: *sog,
                course_over_ground: *cog,
                observed_at: base + Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn empty_history_yields_no_stats() {
        assert!(analyze_movement(&[]).is_none());
    }

    #[test]
    fn single_sample_has_no_variation_and_no_changes() {
        let history = history_from(&[(Some(5.0), Some(90.0))]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.avg_speed, Some(5.0));
        assert_eq!(stats.speed_variation, None);
        assert_eq!(stats.course_change_count, 0);
        assert_eq!(stats.stationary_period_count, 0);
        assert_eq!(stats.sample_count, 1);
    }

    #[test]
    fn missing_speed_samples_yield_unavailable_markers() {
        let history = history_from(&[(None, Some(10.0)), (None, Some(200.0))]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.avg_speed, None);
        assert_eq!(stats.speed_variation, None);
        assert_eq!(stats.course_change_count, 1);
    }

    #[test]
    fn stationary_runs_count_once_each() {
        // Two separate runs below 1.0 knot -> 2, not 4.
        let speeds = [0.5, 0.5, 2.0, 0.2, 0.2, 0.2];
        let history = history_from(
            &speeds.map(|s| (Some(s), None)),
        );
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.stationary_period_count, 2);
    }

    #[test]
    fn course_wraparound_is_not_a_change() {
        // 350 -> 10 is a 20° delta across the 0/360 boundary; 10 -> 10 is zero.
        let history = history_from(&[
            (Some(5.0), Some(350.0)),
            (Some(5.0), Some(10.0)),
            (Some(5.0), Some(10.0)),
        ]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.course_change_count, 0);
    }

    #[test]
    fn large_course_delta_counts() {
        let history = history_from(&[(Some(5.0), Some(10.0)), (Some(5.0), Some(200.0))]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.course_change_count, 1);
    }

    #[test]
    fn reverse_wraparound_is_not_a_change() {
        // 10 -> 350 normalizes to 340, outside (30, 330).
        let history = history_from(&[(Some(5.0), Some(10.0)), (Some(5.0), Some(350.0))]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.course_change_count, 0);
    }

    #[test]
    fn speed_variation_is_sample_standard_deviation() {
        let history = history_from(&[(Some(2.0), None), (Some(4.0), None), (Some(6.0), None)]);
        let stats = analyze_movement(&history).unwrap();
        assert_eq!(stats.avg_speed, Some(4.0));
        // Sample std dev of [2, 4, 6] is 2.0.
        assert!((stats.speed_variation.unwrap() - 2.0).abs() < 1e-12);
    }
}
