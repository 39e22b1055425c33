//! GPX adapter built on the `gpx` crate.
//!
//! All track segments of all tracks are flattened in document order. Points
//! without a timestamp cannot be placed on the time axis and are dropped.
//!
//! The `gpx` crate refuses a whole document when a single `<trkpt>` has an
//! out-of-range or non-numeric coordinate. Such files are re-read point by
//! point with the `quick-xml` streaming reader; coordinates are passed on
//! as-is (NaN when unparseable) and the assembler rejects the bad points.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{SourceFormat, TrackSource};
use crate::{RawSample, Result, SourceTrack, TrackError};

/// Reads GPX 1.0/1.1 track files.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpxSource;

impl TrackSource for GpxSource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Gpx
    }

    fn read_track(&self, source_id: &str, input: &[u8]) -> Result<SourceTrack> {
        let track = match ::gpx::read(Cursor::new(input)) {
            Ok(gpx) => from_document(source_id, &gpx)?,
            Err(e) => {
                debug!(
                    "[GpxSource] {}: {}; reading point by point",
                    source_id, e
                );
                read_points(source_id, input)?
            }
        };
        debug!("[GpxSource] {}: {} samples", source_id, track.samples.len());
        Ok(track)
    }
}

fn from_document(source_id: &str, gpx: &::gpx::Gpx) -> Result<SourceTrack> {
    // Strava writes the sport as a small integer in <trk><type>
    let raw_activity_code = gpx
        .tracks
        .iter()
        .filter_map(|t| t.type_.as_deref())
        .find_map(|t| t.trim().parse::<u8>().ok());

    let mut samples = Vec::new();
    let mut untimed = 0usize;

    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                let Some(time) = point.time.as_ref() else {
                    untimed += 1;
                    continue;
                };
                let iso = time
                    .format()
                    .map_err(|e| TrackError::parse(source_id, e.to_string()))?;
                let timestamp = parse_time(source_id, &iso)?;

                let geo_point = point.point();
                samples.push(RawSample::new(
                    timestamp,
                    geo_point.y(),
                    geo_point.x(),
                    point.elevation,
                ));
            }
        }
    }

    log_untimed(source_id, untimed);

    Ok(SourceTrack {
        source_id: source_id.to_string(),
        samples,
        raw_activity_code,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Time,
    Elevation,
    TrackType,
}

#[derive(Debug)]
struct TrkptBuilder {
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
}

impl TrkptBuilder {
    fn open(source_id: &str, start: &BytesStart) -> Result<Self> {
        Ok(Self {
            latitude: coordinate(source_id, start, "lat")?,
            longitude: coordinate(source_id, start, "lon")?,
            elevation: None,
            time: None,
        })
    }

    fn finish(self) -> Option<RawSample> {
        Some(RawSample::new(
            self.time?,
            self.latitude,
            self.longitude,
            self.elevation,
        ))
    }
}

/// A `lat`/`lon` attribute value; NaN when missing or not a number.
fn coordinate(source_id: &str, start: &BytesStart, name: &str) -> Result<f64> {
    let attr = start
        .try_get_attribute(name)
        .map_err(|e| TrackError::parse(source_id, e.to_string()))?;
    Ok(attr
        .and_then(|a| a.unescape_value().ok().and_then(|v| v.trim().parse().ok()))
        .unwrap_or(f64::NAN))
}

fn parse_time(source_id: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackError::parse(source_id, format!("bad timestamp '{}': {}", text, e)))
}

fn log_untimed(source_id: &str, untimed: usize) {
    if untimed > 0 {
        debug!(
            "[GpxSource] {}: skipped {} points without a timestamp",
            source_id, untimed
        );
    }
}

/// Streaming read of `<trkpt>` elements that leaves coordinate validation to
/// the assembler.
fn read_points(source_id: &str, input: &[u8]) -> Result<SourceTrack> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut samples = Vec::new();
    let mut raw_activity_code = None;
    let mut untimed = 0usize;
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut in_trk = false;
    let mut current: Option<TrkptBuilder> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"gpx" => saw_root = true,
                    b"trk" => in_trk = true,
                    b"trkpt" => current = Some(TrkptBuilder::open(source_id, &e)?),
                    b"ele" if current.is_some() => field = Some(Field::Elevation),
                    b"time" if current.is_some() => field = Some(Field::Time),
                    b"type" if in_trk && current.is_none() => field = Some(Field::TrackType),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"gpx" => saw_root = true,
                // no children, so no timestamp
                b"trkpt" => untimed += 1,
                _ => {}
            },
            Ok(Event::Text(text)) => {
                if let Some(f) = field {
                    let text = text
                        .unescape()
                        .map_err(|e| TrackError::parse(source_id, e.to_string()))?;
                    let text = text.trim();
                    match (f, current.as_mut()) {
                        (Field::Time, Some(point)) => point.time = Some(parse_time(source_id, text)?),
                        (Field::Elevation, Some(point)) => point.elevation = text.parse().ok(),
                        (Field::TrackType, _) if raw_activity_code.is_none() => {
                            raw_activity_code = text.parse::<u8>().ok();
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                field = None;
                match e.local_name().as_ref() {
                    b"trk" => in_trk = false,
                    b"trkpt" => {
                        if let Some(point) = current.take() {
                            match point.finish() {
                                Some(sample) => samples.push(sample),
                                None => untimed += 1,
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TrackError::parse(
                    source_id,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(TrackError::parse(source_id, "missing <gpx> root element"));
    }
    if depth != 0 {
        return Err(TrackError::parse(source_id, "unexpected end of document"));
    }

    log_untimed(source_id, untimed);

    Ok(SourceTrack {
        source_id: source_id.to_string(),
        samples,
        raw_activity_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRAVA_RIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx creator="StravaGPX" version="1.1" xmlns="http://www.topografix.com/GPX/1/1">
 <metadata>
  <time>2018-06-25T07:00:00Z</time>
 </metadata>
 <trk>
  <name>Morning Ride</name>
  <type>1</type>
  <trkseg>
   <trkpt lat="51.5074000" lon="-0.1278000">
    <ele>11.2</ele>
    <time>2018-06-25T07:00:00Z</time>
   </trkpt>
   <trkpt lat="51.5080000" lon="-0.1290000">
    <ele>12.0</ele>
    <time>2018-06-25T07:00:10Z</time>
   </trkpt>
   <trkpt lat="51.5085000" lon="-0.1295000">
   </trkpt>
  </trkseg>
  <trkseg>
   <trkpt lat="51.5090000" lon="-0.1300000">
    <time>2018-06-25T07:00:20Z</time>
   </trkpt>
  </trkseg>
 </trk>
</gpx>"#;

    #[test]
    fn test_reads_points_across_segments() {
        let track = GpxSource.read_track("1573.gpx", STRAVA_RIDE.as_bytes()).unwrap();
        assert_eq!(track.source_id, "1573.gpx");
        assert_eq!(track.samples.len(), 3);

        let first = &track.samples[0];
        assert_eq!(first.latitude, 51.5074);
        assert_eq!(first.longitude, -0.1278);
        assert_eq!(first.elevation, Some(11.2));
        assert_eq!(first.timestamp.to_rfc3339(), "2018-06-25T07:00:00+00:00");

        let last = &track.samples[2];
        assert_eq!(last.elevation, None);
        assert_eq!((last.timestamp - first.timestamp).num_seconds(), 20);
    }

    #[test]
    fn test_reads_embedded_activity_code() {
        let track = GpxSource.read_track("1573.gpx", STRAVA_RIDE.as_bytes()).unwrap();
        assert_eq!(track.raw_activity_code, Some(1));
    }

    #[test]
    fn test_non_numeric_type_is_not_a_code() {
        let gpx = STRAVA_RIDE.replace("<type>1</type>", "<type>cycling</type>");
        let track = GpxSource.read_track("a.gpx", gpx.as_bytes()).unwrap();
        assert_eq!(track.raw_activity_code, None);
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let result = GpxSource.read_track("broken.gpx", b"<gpx><trk><trkseg>");
        assert!(matches!(result, Err(TrackError::Parse { .. })));
    }

    #[test]
    fn test_out_of_range_point_is_passed_on() {
        let gpx = STRAVA_RIDE.replace(r#"lat="51.5080000""#, r#"lat="95.0""#);
        let track = GpxSource.read_track("a.gpx", gpx.as_bytes()).unwrap();

        assert_eq!(track.samples.len(), 3);
        assert_eq!(track.samples[0].latitude, 51.5074);
        assert_eq!(track.samples[1].latitude, 95.0);
        assert_eq!(track.samples[1].elevation, Some(12.0));
        assert_eq!(track.samples[2].longitude, -0.13);
        assert_eq!((track.samples[2].timestamp - track.samples[0].timestamp).num_seconds(), 20);
        assert_eq!(track.raw_activity_code, Some(1));
    }

    #[test]
    fn test_non_numeric_coordinate_becomes_nan() {
        let gpx = STRAVA_RIDE.replace(r#"lon="-0.1290000""#, r#"lon="west""#);
        let track = GpxSource.read_track("a.gpx", gpx.as_bytes()).unwrap();
        assert_eq!(track.samples.len(), 3);
        assert!(track.samples[1].longitude.is_nan());
        assert_eq!(track.samples[1].latitude, 51.508);
    }

    #[test]
    fn test_bad_point_with_bad_timestamp_is_parse_error() {
        let gpx = STRAVA_RIDE
            .replace(r#"lat="51.5080000""#, r#"lat="95.0""#)
            .replace("2018-06-25T07:00:10Z", "yesterday");
        let result = GpxSource.read_track("a.gpx", gpx.as_bytes());
        assert!(matches!(result, Err(TrackError::Parse { .. })));
    }
}
