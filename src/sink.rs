//! CSV output of the enriched table.
//!
//! One header row, then one row per [`EnrichedPoint`] in trajectory order.
//! Timestamps are written as RFC 3339 UTC; a missing elevation is an empty
//! field.

use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;
use log::info;
use serde::Serialize;

use crate::{EnrichedPoint, Result, TrackError};

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    source: &'a str,
    sequence_index: u32,
    activity_id: u32,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    distance_from_prev_km: f64,
    is_activity_start: bool,
    segment_time_seconds: f64,
    cum_distance_km: f64,
    cum_time_seconds: f64,
    activity_type: &'a str,
}

impl<'a> From<&'a EnrichedPoint> for OutputRow<'a> {
    fn from(p: &'a EnrichedPoint) -> Self {
        Self {
            source: &p.record.source_id,
            sequence_index: p.record.sequence_index,
            activity_id: p.activity_id,
            timestamp: p
                .record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            latitude: p.record.latitude,
            longitude: p.record.longitude,
            elevation: p.record.elevation,
            distance_from_prev_km: p.distance_from_prev_km,
            is_activity_start: p.is_activity_start,
            segment_time_seconds: p.segment_time_seconds,
            cum_distance_km: p.cum_distance_km,
            cum_time_seconds: p.cum_time_seconds,
            activity_type: &p.activity_type,
        }
    }
}

/// Write rows as CSV to any writer.
pub fn write_csv_to<W: Write>(writer: W, rows: &[EnrichedPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(OutputRow::from(row))?;
    }
    wtr.flush().map_err(|e| TrackError::Csv(e.into()))?;
    Ok(())
}

/// Write rows as CSV to `path`, creating or truncating the file.
pub fn write_csv(path: &Path, rows: &[EnrichedPoint]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TrackError::io(parent, e))?;
    }
    let file = std::fs::File::create(path).map_err(|e| TrackError::io(path, e))?;
    write_csv_to(file, rows)?;
    info!("[Sink] Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run, PipelineConfig, RawSample, SourceTrack};
    use chrono::{TimeZone, Utc};

    fn sample_rows() -> Vec<EnrichedPoint> {
        let t0 = Utc.with_ymd_and_hms(2018, 12, 30, 10, 10, 40).unwrap();
        let track = SourceTrack::new(
            "Lunch_Run.tcx",
            vec![
                RawSample::new(t0, 51.5074, -0.1278, Some(14.5)),
                RawSample::new(t0 + chrono::Duration::seconds(5), 51.5080, -0.1290, None),
            ],
        );
        run(vec![track], &PipelineConfig::default()).unwrap().rows
    }

    #[test]
    fn test_header_and_rows() {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, &sample_rows()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "source,sequence_index,activity_id,timestamp,latitude,longitude,elevation,\
             distance_from_prev_km,is_activity_start,segment_time_seconds,cum_distance_km,\
             cum_time_seconds,activity_type"
        );
        assert!(lines[1].starts_with("Lunch_Run.tcx,0,1,2018-12-30T10:10:40Z,51.5074,-0.1278,14.5,0.0,true,0.0,0.0,0.0,Run"));
    }

    #[test]
    fn test_missing_elevation_is_empty_field() {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, &sample_rows()).unwrap();

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&records[1][6], "");
        assert_eq!(&records[1][8], "false");
        assert_eq!(&records[1][11], "5.0");
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("my_activities.csv");
        write_csv(&path, &sample_rows()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
