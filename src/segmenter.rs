//! Activity segmentation.
//!
//! One source file is one activity. Activity ids are dense, start at 1 and
//! follow the order in which sources first appear in the trajectory. The
//! start flag computed here is the only boundary signal used downstream.

use std::collections::HashMap;

use crate::Trajectory;

/// Activity membership of a single trajectory point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityAssignment {
    pub activity_id: u32,
    /// First point of its activity (`sequence_index == 0`)
    pub is_activity_start: bool,
}

/// Assign an activity id and start flag to every point.
pub fn assign_activities(trajectory: &Trajectory) -> Vec<ActivityAssignment> {
    let mut ids: HashMap<&str, u32> = HashMap::new();

    trajectory
        .points()
        .iter()
        .map(|p| {
            let next_id = ids.len() as u32 + 1;
            let activity_id = *ids.entry(&*p.source_id).or_insert(next_id);
            ActivityAssignment {
                activity_id,
                is_activity_start: p.sequence_index == 0,
            }
        })
        .collect()
}

/// Number of distinct activities in an assignment.
pub fn activity_count(assignments: &[ActivityAssignment]) -> u32 {
    assignments.iter().map(|a| a.activity_id).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assemble, RawSample, SourceTrack};
    use chrono::{TimeZone, Utc};

    fn track(name: &str, n: usize) -> SourceTrack {
        let t0 = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();
        SourceTrack::new(
            name,
            (0..n)
                .map(|i| {
                    RawSample::new(
                        t0 + chrono::Duration::seconds(10 * i as i64),
                        51.5 + i as f64 * 0.001,
                        -0.12,
                        None,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_two_files_three_and_two_points() {
        let (trajectory, _) = assemble(vec![track("a.gpx", 3), track("b.gpx", 2)]).unwrap();
        let assignments = assign_activities(&trajectory);

        let ids: Vec<u32> = assignments.iter().map(|a| a.activity_id).collect();
        let starts: Vec<bool> = assignments.iter().map(|a| a.is_activity_start).collect();
        assert_eq!(ids, vec![1, 1, 1, 2, 2]);
        assert_eq!(starts, vec![true, false, false, true, false]);
        assert_eq!(activity_count(&assignments), 2);
    }

    #[test]
    fn test_ids_follow_appearance_not_name() {
        let (trajectory, _) =
            assemble(vec![track("9.gpx", 1), track("1.gpx", 1), track("5.gpx", 1)]).unwrap();
        let ids: Vec<u32> = assign_activities(&trajectory)
            .iter()
            .map(|a| a.activity_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_single_source_is_activity_one() {
        let (trajectory, _) = assemble(vec![track("a.gpx", 4)]).unwrap();
        let assignments = assign_activities(&trajectory);
        assert!(assignments.iter().all(|a| a.activity_id == 1));
        assert_eq!(assignments.iter().filter(|a| a.is_activity_start).count(), 1);
    }

    #[test]
    fn test_empty_assignment_count() {
        assert_eq!(activity_count(&[]), 0);
    }
}
