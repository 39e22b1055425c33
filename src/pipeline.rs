//! Pipeline entry points.
//!
//! [`run`] takes already-parsed tracks; [`process_directory`] discovers and
//! parses the files of an export directory first. Both hand the assembled
//! trajectory to [`enrich`] and then label activities.
//!
//! ```text
//! adapters -> assemble -> distance -> segment -> sanitize gaps -> accumulate -> activity type
//! ```

use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;

use crate::activity_type::{resolve_activity_types, ActivityTypePolicy, ResolutionReport};
use crate::aggregate::accumulate;
use crate::assembler::{assemble, AssemblyReport};
use crate::distance::raw_distances_km;
use crate::gaps::{raw_segment_times, sanitize_segments, GapStats};
use crate::geo_utils::EARTH_RADIUS_KM;
use crate::segmenter::{activity_count, assign_activities};
use crate::sources::{discover_sources, DiscoveredFile};
use crate::{EnrichedPoint, Result, SourceTrack, TrackError, Trajectory};

/// What to do when a source file does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// Log a warning and leave the file out of the trajectory
    #[default]
    Skip,
    /// Stop the run with the parse error
    Abort,
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Elapsed time above which a segment counts as a paused recording.
    /// Default: 180.0 seconds
    pub pause_threshold_secs: f64,

    /// Sphere radius for haversine distance.
    /// Default: 6367.0 km
    pub earth_radius_km: f64,

    /// Handling of unparseable source files. Default: skip
    pub parse_failure_policy: ParseFailurePolicy,

    /// How activities get their type label. Default: filename heuristic
    pub activity_type_policy: ActivityTypePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pause_threshold_secs: 180.0,
            earth_radius_km: EARTH_RADIUS_KM,
            parse_failure_policy: ParseFailurePolicy::Skip,
            activity_type_policy: ActivityTypePolicy::default(),
        }
    }
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Track files found (directory runs only)
    pub files_discovered: usize,
    /// Files excluded because they did not parse
    pub skipped_files: Vec<String>,
    pub assembly: AssemblyReport,
    pub activities: u32,
    pub gaps: GapStats,
    pub activity_types: ResolutionReport,
    /// Rows in the final table
    pub rows: usize,
}

/// Enriched table plus the run summary.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: Vec<EnrichedPoint>,
    pub report: RunReport,
}

/// Rows from [`enrich`] with the counts gathered on the way.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub rows: Vec<EnrichedPoint>,
    /// Distinct activities in the trajectory
    pub activities: u32,
    pub gaps: GapStats,
}

/// Compute distance, activity, gap and cumulative fields for every point.
///
/// Activity types are left empty; see [`crate::activity_type`].
pub fn enrich(trajectory: &Trajectory, config: &PipelineConfig) -> Enrichment {
    let distances = raw_distances_km(trajectory, config.earth_radius_km);
    let times = raw_segment_times(trajectory);
    let assignments = assign_activities(trajectory);
    let activities = activity_count(&assignments);
    debug!(
        "[TrackEtl] {} points in {} activities",
        trajectory.len(),
        activities
    );
    let (deltas, gap_stats) =
        sanitize_segments(&distances, &times, &assignments, config.pause_threshold_secs);
    let totals = accumulate(&deltas, &assignments);

    let rows = trajectory
        .points()
        .iter()
        .zip(assignments)
        .zip(deltas)
        .zip(totals)
        .map(|(((record, assignment), delta), total)| EnrichedPoint {
            record: record.clone(),
            activity_id: assignment.activity_id,
            distance_from_prev_km: delta.distance_km,
            is_activity_start: assignment.is_activity_start,
            segment_time_seconds: delta.time_seconds,
            cum_distance_km: total.cum_distance_km,
            cum_time_seconds: total.cum_time_seconds,
            activity_type: String::new(),
        })
        .collect();

    Enrichment {
        rows,
        activities,
        gaps: gap_stats,
    }
}

/// Run the pipeline over tracks supplied in enumeration order.
pub fn run(tracks: Vec<SourceTrack>, config: &PipelineConfig) -> Result<PipelineOutput> {
    run_with_report(tracks, config, RunReport::default())
}

fn run_with_report(
    tracks: Vec<SourceTrack>,
    config: &PipelineConfig,
    mut report: RunReport,
) -> Result<PipelineOutput> {
    let start = Instant::now();

    let (trajectory, assembly) = assemble(tracks)?;
    let enrichment = enrich(&trajectory, config);
    let (rows, activity_types) =
        resolve_activity_types(enrichment.rows, &config.activity_type_policy);

    report.assembly = assembly;
    report.activities = enrichment.activities;
    report.gaps = enrichment.gaps;
    report.activity_types = activity_types;
    report.rows = rows.len();

    info!(
        "[TrackEtl] {} points, {} activities -> {} rows in {:?}",
        trajectory.len(),
        report.activities,
        report.rows,
        start.elapsed()
    );

    Ok(PipelineOutput { rows, report })
}

/// Discover, parse and process every GPX/TCX file directly inside `dir`.
///
/// Files are processed in file-name order. Unreadable files always abort
/// the run; files that fail to parse follow
/// [`PipelineConfig::parse_failure_policy`].
pub fn process_directory(dir: &Path, config: &PipelineConfig) -> Result<PipelineOutput> {
    let start = Instant::now();
    let files = discover_sources(dir)?;
    info!(
        "[TrackEtl] Found {} track files in {}",
        files.len(),
        dir.display()
    );

    let mut report = RunReport {
        files_discovered: files.len(),
        ..RunReport::default()
    };

    let mut tracks = Vec::with_capacity(files.len());
    for (file, result) in files.iter().zip(read_all(&files)) {
        match result {
            Ok(track) => tracks.push(track),
            Err(err @ TrackError::Parse { .. })
                if config.parse_failure_policy == ParseFailurePolicy::Skip =>
            {
                warn!("[TrackEtl] Skipping {}: {}", file.path.display(), err);
                report.skipped_files.push(file.source_id.clone());
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        "[TrackEtl] Parsed {} files ({} skipped) in {:?}",
        tracks.len(),
        report.skipped_files.len(),
        start.elapsed()
    );

    run_with_report(tracks, config, report)
}

/// Read and parse every file, keeping discovery order.
#[cfg(feature = "parallel")]
fn read_all(files: &[DiscoveredFile]) -> Vec<Result<SourceTrack>> {
    use rayon::prelude::*;
    files.par_iter().map(DiscoveredFile::read).collect()
}

#[cfg(not(feature = "parallel"))]
fn read_all(files: &[DiscoveredFile]) -> Vec<Result<SourceTrack>> {
    files.iter().map(DiscoveredFile::read).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawSample;
    use chrono::{TimeZone, Utc};

    fn track(name: &str, steps: &[(i64, f64, f64)]) -> SourceTrack {
        let t0 = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();
        SourceTrack::new(
            name,
            steps
                .iter()
                .map(|&(s, lat, lng)| {
                    RawSample::new(t0 + chrono::Duration::seconds(s), lat, lng, None)
                })
                .collect(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.pause_threshold_secs, 180.0);
        assert_eq!(config.earth_radius_km, 6367.0);
        assert_eq!(config.parse_failure_policy, ParseFailurePolicy::Skip);
        assert_eq!(config.activity_type_policy.name(), "filename");
    }

    #[test]
    fn test_enrich_first_points_are_zero() {
        let (trajectory, _) = assemble(vec![
            track("a.gpx", &[(0, 51.50, -0.12), (10, 51.51, -0.12)]),
            track("b.gpx", &[(20, 40.71, -74.00), (30, 40.72, -74.00)]),
        ])
        .unwrap();

        let enrichment = enrich(&trajectory, &PipelineConfig::default());
        assert_eq!(enrichment.activities, 2);
        let rows = enrichment.rows;
        for row in rows.iter().filter(|r| r.is_activity_start) {
            assert_eq!(row.distance_from_prev_km, 0.0);
            assert_eq!(row.segment_time_seconds, 0.0);
            assert_eq!(row.cum_distance_km, 0.0);
            assert_eq!(row.cum_time_seconds, 0.0);
        }
        assert_eq!(rows[3].cum_time_seconds, 10.0);
        assert!(rows.iter().all(|r| r.activity_type.is_empty()));
    }

    #[test]
    fn test_run_reports_counts() {
        let output = run(
            vec![
                track("Ride_1.gpx", &[(0, 51.50, -0.12), (500, 51.51, -0.12)]),
                track("Run_2.gpx", &[(0, 51.50, -0.12), (10, f64::NAN, 0.0)]),
            ],
            &PipelineConfig::default(),
        )
        .unwrap();

        assert_eq!(output.report.activities, 2);
        assert_eq!(output.report.assembly.rejected_points, 1);
        assert_eq!(output.report.gaps.paused_segments, 1);
        assert_eq!(output.report.rows, 3);
        assert_eq!(output.rows[2].activity_type, "Run");
    }

    #[test]
    fn test_run_empty_input() {
        assert!(matches!(
            run(vec![], &PipelineConfig::default()),
            Err(TrackError::EmptyInput)
        ));
    }

    #[test]
    fn test_custom_radius_and_threshold() {
        let config = PipelineConfig {
            pause_threshold_secs: 5.0,
            earth_radius_km: 1.0,
            ..PipelineConfig::default()
        };
        let output = run(vec![track("a.gpx", &[(0, 0.0, 0.0), (10, 0.0, 1.0)])], &config).unwrap();
        let last = &output.rows[1];
        assert_eq!(last.segment_time_seconds, 0.0);
        assert!((last.distance_from_prev_km - std::f64::consts::PI / 180.0).abs() < 1e-12);
    }
}
