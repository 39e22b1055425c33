//! # Geographic Utilities
//!
//! Spherical-earth distance and coordinate checks used by the trajectory
//! engine.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_km`] | Great-circle distance between two points on a sphere of given radius |
//! | [`is_valid_coordinate`] | Latitude/longitude range and finiteness check |
//!
//! ## Haversine Formula
//!
//! ```text
//! a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)
//! c = 2·asin(√a)
//! d = R·c
//! ```
//!
//! `R` is a fixed mean radius rather than an ellipsoid model: results must be
//! reproducible across exports, accuracy is secondary. The default used by the
//! pipeline is [`EARTH_RADIUS_KM`].
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use geo::Point;

/// Mean earth radius in kilometers used by default.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance in kilometers between two points (x = longitude,
/// y = latitude, degrees) on a sphere of `radius_km`.
///
/// `a` is clamped to `[0, 1]` so floating-point round-off can never produce a
/// NaN; identical points give exactly 0.
///
/// # Example
///
/// ```rust
/// use geo::Point;
/// use track_etl::geo_utils::{haversine_km, EARTH_RADIUS_KM};
///
/// let origin = Point::new(0.0, 0.0);
/// let one_degree_east = Point::new(1.0, 0.0);
///
/// let d = haversine_km(origin, one_degree_east, EARTH_RADIUS_KM);
/// assert!((d - 111.12).abs() < 0.1);
/// assert_eq!(haversine_km(origin, origin, EARTH_RADIUS_KM), 0.0);
/// ```
#[inline]
pub fn haversine_km(p1: Point<f64>, p2: Point<f64>, radius_km: f64) -> f64 {
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.x() - p1.x()).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    radius_km * c
}

// =============================================================================
// Validation
// =============================================================================

/// Check that a latitude/longitude pair is finite and within range.
#[inline]
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Distance, Haversine};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_same_point() {
        let p = Point::new(-0.1278, 51.5074);
        assert_eq!(haversine_km(p, p, EARTH_RADIUS_KM), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_longitude_at_equator() {
        let d = haversine_km(Point::new(0.0, 0.0), Point::new(1.0, 0.0), EARTH_RADIUS_KM);
        // 6367 * pi / 180
        assert!(approx_eq(d, 111.2, 111.2 * 0.005));
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let london = Point::new(-0.1278, 51.5074);
        let paris = Point::new(2.3522, 48.8566);
        assert_eq!(
            haversine_km(london, paris, EARTH_RADIUS_KM),
            haversine_km(paris, london, EARTH_RADIUS_KM)
        );
    }

    #[test]
    fn test_haversine_matches_geo_with_same_radius() {
        // geo's Haversine uses the IUGG mean radius in meters
        let london = Point::new(-0.1278, 51.5074);
        let paris = Point::new(2.3522, 48.8566);
        let ours = haversine_km(london, paris, 6371.0088);
        let theirs = Haversine::distance(london, paris) / 1000.0;
        assert!(approx_eq(ours, theirs, 0.01));
    }

    #[test]
    fn test_haversine_antipodal_does_not_nan() {
        let d = haversine_km(Point::new(0.0, 0.0), Point::new(180.0, 0.0), EARTH_RADIUS_KM);
        assert!(d.is_finite());
        assert!(approx_eq(d, EARTH_RADIUS_KM * std::f64::consts::PI, 1e-6));
    }

    #[test]
    fn test_radius_scales_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 1.0);
        let d1 = haversine_km(a, b, 1000.0);
        let d2 = haversine_km(a, b, 2000.0);
        assert!(approx_eq(d2, 2.0 * d1, 1e-9));
    }

    #[test]
    fn test_is_valid_coordinate() {
        assert!(is_valid_coordinate(51.5074, -0.1278));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, -181.0));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
        assert!(!is_valid_coordinate(0.0, f64::INFINITY));
    }
}
