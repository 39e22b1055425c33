//! Gap sanitizer.
//!
//! Turns raw per-point distance and elapsed time into the deltas that feed
//! the running totals:
//!
//! | Condition | distance | time |
//! |-----------|----------|------|
//! | first point of an activity | 0 | 0 |
//! | elapsed time > pause threshold | raw | 0 |
//! | otherwise | raw | raw |
//!
//! A paused recording still moved the athlete somewhere, so distance over a
//! pause is kept while the pause itself does not count as moving time.
//! Out-of-order timestamps produce a negative elapsed time, which is zeroed
//! and counted so cumulative time never goes backwards.

use log::debug;
use serde::Serialize;

use crate::segmenter::ActivityAssignment;
use crate::Trajectory;

/// Distance/time contribution of the segment ending at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDeltas {
    pub distance_km: f64,
    pub time_seconds: f64,
}

/// Counts of segments whose time was suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapStats {
    /// Segments longer than the pause threshold
    pub paused_segments: usize,
    /// Segments with a timestamp earlier than their predecessor
    pub backwards_segments: usize,
}

/// Elapsed seconds (millisecond resolution) from each point's predecessor in
/// global order. The first point overall gets 0.
pub fn raw_segment_times(trajectory: &Trajectory) -> Vec<f64> {
    let points = trajectory.points();
    let mut times = Vec::with_capacity(points.len());

    if points.is_empty() {
        return times;
    }

    times.push(0.0);
    times.extend(
        points
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_milliseconds() as f64 / 1000.0),
    );
    times
}

/// Apply the boundary and pause rules to raw distances and times.
///
/// All three slices are indexed by trajectory position and must have the
/// same length.
pub fn sanitize_segments(
    raw_distances_km: &[f64],
    raw_times_secs: &[f64],
    assignments: &[ActivityAssignment],
    pause_threshold_secs: f64,
) -> (Vec<SegmentDeltas>, GapStats) {
    debug_assert_eq!(raw_distances_km.len(), raw_times_secs.len());
    debug_assert_eq!(raw_distances_km.len(), assignments.len());

    let mut stats = GapStats::default();

    let deltas = raw_distances_km
        .iter()
        .zip(raw_times_secs)
        .zip(assignments)
        .map(|((&distance_km, &time_seconds), assignment)| {
            if assignment.is_activity_start {
                return SegmentDeltas {
                    distance_km: 0.0,
                    time_seconds: 0.0,
                };
            }

            let time_seconds = if time_seconds > pause_threshold_secs {
                stats.paused_segments += 1;
                0.0
            } else if time_seconds < 0.0 {
                stats.backwards_segments += 1;
                0.0
            } else {
                time_seconds
            };

            SegmentDeltas {
                distance_km,
                time_seconds,
            }
        })
        .collect();

    debug!(
        "[GapSanitizer] {} paused segments, {} backwards segments (threshold {}s)",
        stats.paused_segments, stats.backwards_segments, pause_threshold_secs
    );

    (deltas, stats)
}
