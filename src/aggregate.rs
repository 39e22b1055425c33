//! Cumulative aggregation of segment deltas per activity.

use crate::gaps::SegmentDeltas;
use crate::segmenter::ActivityAssignment;

/// Running totals at a point, since the start of its activity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub cum_distance_km: f64,
    pub cum_time_seconds: f64,
}

/// Running sums of distance and time, restarted whenever the activity id
/// changes.
///
/// The restart does not rely on the first delta of an activity being zero;
/// no state crosses an activity transition.
pub fn accumulate(deltas: &[SegmentDeltas], assignments: &[ActivityAssignment]) -> Vec<Totals> {
    debug_assert_eq!(deltas.len(), assignments.len());

    let mut current: Option<u32> = None;
    let mut running = Totals::default();

    deltas
        .iter()
        .zip(assignments)
        .map(|(delta, assignment)| {
            if current != Some(assignment.activity_id) {
                current = Some(assignment.activity_id);
                running = Totals::default();
            }
            running.cum_distance_km += delta.distance_km;
            running.cum_time_seconds += delta.time_seconds;
            running
        })
        .collect()
}
