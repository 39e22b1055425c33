//! Distance engine: great-circle distance from each point to its immediate
//! predecessor in global trajectory order.
//!
//! The predecessor of the first point of a source is the last point of the
//! previous source. That cross-boundary value is computed like any other and
//! discarded later by the gap sanitizer, which owns activity boundaries.

use crate::geo_utils::haversine_km;
use crate::Trajectory;

/// Raw distance in kilometers from each point to the one before it.
///
/// The first point overall has no predecessor and gets 0.
pub fn raw_distances_km(trajectory: &Trajectory, earth_radius_km: f64) -> Vec<f64> {
    let points = trajectory.points();
    let mut distances = Vec::with_capacity(points.len());

    if points.is_empty() {
        return distances;
    }

    distances.push(0.0);
    distances.extend(
        points
            .windows(2)
            .map(|w| haversine_km(w[0].point(), w[1].point(), earth_radius_km)),
    );
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::EARTH_RADIUS_KM;
    use crate::{assemble, RawSample, SourceTrack};
    use chrono::{TimeZone, Utc};

    fn track(name: &str, coords: &[(f64, f64)]) -> SourceTrack {
        let t = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();
        SourceTrack::new(
            name,
            coords
                .iter()
                .map(|&(lat, lng)| RawSample::new(t, lat, lng, None))
                .collect(),
        )
    }

    #[test]
    fn test_first_point_is_zero() {
        let (trajectory, _) = assemble(vec![track("a.gpx", &[(10.0, 10.0)])]).unwrap();
        assert_eq!(raw_distances_km(&trajectory, EARTH_RADIUS_KM), vec![0.0]);
    }

    #[test]
    fn test_identical_points_are_zero() {
        let (trajectory, _) =
            assemble(vec![track("a.gpx", &[(51.5, -0.12), (51.5, -0.12)])]).unwrap();
        let d = raw_distances_km(&trajectory, EARTH_RADIUS_KM);
        assert_eq!(d, vec![0.0, 0.0]);
    }

    #[test]
    fn test_one_degree_along_equator() {
        let (trajectory, _) = assemble(vec![track("a.gpx", &[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        let d = raw_distances_km(&trajectory, EARTH_RADIUS_KM);
        assert!((d[1] - 111.2).abs() < 111.2 * 0.005);
    }

    #[test]
    fn test_cross_boundary_distance_is_computed() {
        let (trajectory, _) = assemble(vec![
            track("a.gpx", &[(0.0, 0.0)]),
            track("b.gpx", &[(0.0, 1.0)]),
        ])
        .unwrap();
        let d = raw_distances_km(&trajectory, EARTH_RADIUS_KM);
        assert!(d[1] > 100.0);
    }

    #[test]
    fn test_radius_is_honoured() {
        let (trajectory, _) = assemble(vec![track("a.gpx", &[(0.0, 0.0), (0.0, 1.0)])]).unwrap();
        let small = raw_distances_km(&trajectory, 1.0);
        assert!((small[1] - std::f64::consts::PI / 180.0).abs() < 1e-12);
    }
}
