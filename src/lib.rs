//! # Track ETL
//!
//! Batch normalization of GPS activity exports (GPX and TCX) into a single
//! enriched trajectory table.
//!
//! This library provides:
//! - Format adapters that turn GPX/TCX files into ordered point sequences
//! - A trajectory engine that measures per-segment distance and elapsed time,
//!   splits the stream into activities and accumulates totals per activity
//! - Activity-type resolution by filename, embedded code, or metadata join
//! - A CSV sink for the enriched table
//!
//! ## Features
//!
//! - **`parallel`** - Parse source files on a rayon pool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use track_etl::{run, PipelineConfig, RawSample, SourceTrack};
//!
//! let t0 = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();
//! let track = SourceTrack::new(
//!     "Morning_Ride.gpx",
//!     vec![
//!         RawSample::new(t0, 51.5074, -0.1278, Some(11.0)),
//!         RawSample::new(t0 + chrono::Duration::seconds(10), 51.5080, -0.1290, Some(12.0)),
//!         RawSample::new(t0 + chrono::Duration::seconds(20), 51.5090, -0.1300, None),
//!     ],
//! );
//!
//! let output = run(vec![track], &PipelineConfig::default()).unwrap();
//! let last = output.rows.last().unwrap();
//! assert_eq!(last.activity_id, 1);
//! assert_eq!(last.cum_time_seconds, 20.0);
//! assert_eq!(last.activity_type, "Ride");
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;

// Unified error handling
pub mod error;
pub use error::{Result, TrackError};

// Geographic utilities (haversine, coordinate validation)
pub mod geo_utils;

// Source format adapters (GPX, TCX) and file discovery
pub mod sources;
pub use sources::{discover_sources, DiscoveredFile, GpxSource, SourceFormat, TcxSource, TrackSource};

// Trajectory assembly from per-file point sequences
pub mod assembler;
pub use assembler::{assemble, AssemblyReport};

// Per-segment distance, activity partitioning, gap handling, running totals
pub mod distance;
pub mod segmenter;
pub mod gaps;
pub mod aggregate;
pub use aggregate::Totals;
pub use gaps::SegmentDeltas;
pub use segmenter::ActivityAssignment;

// Activity-type resolution
pub mod activity_type;
pub use activity_type::{
    load_activity_metadata, ActivityTypePolicy, ResolutionReport, DEFAULT_ACTIVITY_CODES,
};

// Pipeline entry points
pub mod pipeline;
pub use pipeline::{
    enrich, process_directory, run, Enrichment, ParseFailurePolicy, PipelineConfig,
    PipelineOutput, RunReport,
};

// CSV output
pub mod sink;
pub use sink::{write_csv, write_csv_to};

// ============================================================================
// Core Types
// ============================================================================

/// One timed GPS sample as produced by a format adapter, before assembly.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use track_etl::RawSample;
///
/// let t = Utc.with_ymd_and_hms(2018, 1, 4, 9, 30, 0).unwrap();
/// let sample = RawSample::new(t, 51.5074, -0.1278, Some(35.2));
/// assert_eq!(sample.elevation, Some(35.2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters, when the recording has one
    pub elevation: Option<f64>,
}

impl RawSample {
    /// Create a new sample.
    pub fn new(
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            elevation,
        }
    }
}

/// All samples read from one source file, in recording order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    /// Display name of the origin file (e.g. `"1573.gpx"`)
    pub source_id: String,
    /// Samples in file order
    pub samples: Vec<RawSample>,
    /// Activity-type code embedded in the file, if the format carries one
    pub raw_activity_code: Option<u8>,
}

impl SourceTrack {
    /// Create a track without an embedded activity code.
    pub fn new(source_id: impl Into<String>, samples: Vec<RawSample>) -> Self {
        Self {
            source_id: source_id.into(),
            samples,
            raw_activity_code: None,
        }
    }

    /// Attach an embedded activity code.
    pub fn with_activity_code(mut self, code: Option<u8>) -> Self {
        self.raw_activity_code = code;
        self
    }
}

/// A sample placed in the global trajectory.
///
/// Immutable once produced by the assembler; `sequence_index` restarts at 0
/// for every source.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    /// Identifier of the origin file
    pub source_id: Arc<str>,
    /// 0-based position within `source_id`
    pub sequence_index: u32,
    pub timestamp: DateTime<Utc>,
    /// Degrees, -90..=90
    pub latitude: f64,
    /// Degrees, -180..=180
    pub longitude: f64,
    /// Meters
    pub elevation: Option<f64>,
    pub raw_activity_code: Option<u8>,
}

impl PointRecord {
    /// Position as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Ordered sequence of points spanning all input files.
///
/// Ordering is (file enumeration order, then `sequence_index`). Built by
/// [`assemble`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    points: Vec<PointRecord>,
}

impl Trajectory {
    pub(crate) fn from_points(points: Vec<PointRecord>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A trajectory point with its derived per-activity fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPoint {
    pub record: PointRecord,
    /// Dense activity identifier, starting at 1
    pub activity_id: u32,
    pub distance_from_prev_km: f64,
    /// True for the first point of each activity
    pub is_activity_start: bool,
    pub segment_time_seconds: f64,
    pub cum_distance_km: f64,
    pub cum_time_seconds: f64,
    pub activity_type: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_track(name: &str, n: usize) -> SourceTrack {
        let t0 = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();
        let samples = (0..n)
            .map(|i| {
                RawSample::new(
                    t0 + chrono::Duration::seconds(10 * i as i64),
                    51.5074 + i as f64 * 0.001,
                    -0.1278,
                    None,
                )
            })
            .collect();
        SourceTrack::new(name, samples)
    }

    #[test]
    fn test_point_record_geo_point() {
        let trajectory = assemble(vec![sample_track("a.gpx", 1)]).unwrap().0;
        let p = trajectory.points()[0].point();
        assert_eq!(p.x(), -0.1278);
        assert_eq!(p.y(), 51.5074);
    }

    #[test]
    fn test_with_activity_code() {
        let track = sample_track("a.gpx", 1).with_activity_code(Some(9));
        assert_eq!(track.raw_activity_code, Some(9));
    }
}
