//! Trajectory assembly.
//!
//! Concatenates per-file sample sequences into one [`Trajectory`], in the
//! order the sources were enumerated. Within each source the samples keep
//! their file order and receive `sequence_index` 0, 1, 2, ... Points with
//! malformed coordinates are rejected here so no NaN ever reaches the
//! distance engine; indices are assigned after rejection, so every source
//! that contributes points still starts at 0.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::geo_utils::is_valid_coordinate;
use crate::{PointRecord, Result, SourceTrack, TrackError, Trajectory};

/// What the assembler kept and what it threw away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Sources that contributed at least one point
    pub sources_used: usize,
    /// Sources with no valid point at all
    pub empty_sources: Vec<String>,
    /// Points rejected for malformed coordinates
    pub rejected_points: usize,
}

/// Build the global trajectory from per-file tracks, in enumeration order.
///
/// Fails with [`TrackError::EmptyInput`] when no track contributes a valid
/// point and with [`TrackError::DuplicateSource`] when two tracks share a
/// source identifier.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use track_etl::{assemble, RawSample, SourceTrack};
///
/// let t = Utc.with_ymd_and_hms(2018, 1, 4, 9, 30, 0).unwrap();
/// let a = SourceTrack::new("a.gpx", vec![RawSample::new(t, 1.0, 1.0, None); 3]);
/// let b = SourceTrack::new("b.gpx", vec![RawSample::new(t, 2.0, 2.0, None); 2]);
///
/// let (trajectory, report) = assemble(vec![a, b]).unwrap();
/// let indices: Vec<u32> = trajectory.points().iter().map(|p| p.sequence_index).collect();
/// assert_eq!(indices, vec![0, 1, 2, 0, 1]);
/// assert_eq!(report.sources_used, 2);
/// ```
pub fn assemble(tracks: Vec<SourceTrack>) -> Result<(Trajectory, AssemblyReport)> {
    let mut report = AssemblyReport::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(tracks.len());
    let total: usize = tracks.iter().map(|t| t.samples.len()).sum();
    let mut points = Vec::with_capacity(total);

    for track in tracks {
        if !seen.insert(track.source_id.clone()) {
            return Err(TrackError::DuplicateSource(track.source_id));
        }

        let source_id: Arc<str> = Arc::from(track.source_id.as_str());
        let mut sequence_index: u32 = 0;

        for (i, sample) in track.samples.iter().enumerate() {
            if !is_valid_coordinate(sample.latitude, sample.longitude) {
                let err = TrackError::MalformedCoordinate {
                    source_id: track.source_id.clone(),
                    index: i,
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                };
                warn!("[Assembler] Rejected: {}", err);
                report.rejected_points += 1;
                continue;
            }

            points.push(PointRecord {
                source_id: Arc::clone(&source_id),
                sequence_index,
                timestamp: sample.timestamp,
                latitude: sample.latitude,
                longitude: sample.longitude,
                elevation: sample.elevation,
                raw_activity_code: track.raw_activity_code,
            });
            sequence_index += 1;
        }

        if sequence_index == 0 {
            debug!("[Assembler] {} contributed no points", track.source_id);
            report.empty_sources.push(track.source_id);
        } else {
            report.sources_used += 1;
        }
    }

    if points.is_empty() {
        return Err(TrackError::EmptyInput);
    }

    debug!(
        "[Assembler] {} points from {} sources ({} rejected)",
        points.len(),
        report.sources_used,
        report.rejected_points
    );

    Ok((Trajectory::from_points(points), report))
}
