//! TCX adapter built on the `quick-xml` streaming reader.
//!
//! Only `<Trackpoint>` elements are read. A trackpoint without `<Time>` or
//! without `<Position>` (GPS lost, indoor recording) is skipped; numbers that
//! fail to parse are passed on as NaN so the assembler rejects them along with
//! every other malformed coordinate.

use chrono::{DateTime, Utc};
use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{SourceFormat, TrackSource};
use crate::{RawSample, Result, SourceTrack, TrackError};

/// Reads Garmin Training Center (TCX) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcxSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Time,
    Latitude,
    Longitude,
    Altitude,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"Time" => Some(Field::Time),
            b"LatitudeDegrees" => Some(Field::Latitude),
            b"LongitudeDegrees" => Some(Field::Longitude),
            b"AltitudeMeters" => Some(Field::Altitude),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct TrackpointBuilder {
    time: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
}

impl TrackpointBuilder {
    fn set(&mut self, source_id: &str, field: Field, text: &str) -> Result<()> {
        let text = text.trim();
        match field {
            Field::Time => {
                let time = DateTime::parse_from_rfc3339(text).map_err(|e| {
                    TrackError::parse(source_id, format!("bad timestamp '{}': {}", text, e))
                })?;
                self.time = Some(time.with_timezone(&Utc));
            }
            Field::Latitude => self.latitude = Some(text.parse().unwrap_or(f64::NAN)),
            Field::Longitude => self.longitude = Some(text.parse().unwrap_or(f64::NAN)),
            Field::Altitude => self.altitude = text.parse().ok(),
        }
        Ok(())
    }

    /// A coordinate element that is present but empty still marks the
    /// point as positioned, with a NaN value for the assembler to reject.
    fn open(&mut self, field: Field) {
        match field {
            Field::Latitude => self.latitude = Some(f64::NAN),
            Field::Longitude => self.longitude = Some(f64::NAN),
            Field::Time | Field::Altitude => {}
        }
    }

    fn finish(self) -> Option<RawSample> {
        Some(RawSample::new(
            self.time?,
            self.latitude?,
            self.longitude?,
            self.altitude,
        ))
    }
}

impl TrackSource for TcxSource {
    fn format(&self) -> SourceFormat {
        SourceFormat::Tcx
    }

    fn read_track(&self, source_id: &str, input: &[u8]) -> Result<SourceTrack> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut samples = Vec::new();
        let mut incomplete = 0usize;
        let mut saw_root = false;
        let mut current: Option<TrackpointBuilder> = None;
        let mut field: Option<Field> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = e.local_name();
                    match name.as_ref() {
                        b"TrainingCenterDatabase" => saw_root = true,
                        b"Trackpoint" => current = Some(TrackpointBuilder::default()),
                        tag => {
                            if let Some(tp) = current.as_mut() {
                                field = Field::from_tag(tag);
                                if let Some(f) = field {
                                    tp.open(f);
                                }
                            }
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = e.local_name();
                    if let (Some(f), Some(tp)) = (Field::from_tag(name.as_ref()), current.as_mut()) {
                        tp.open(f);
                    }
                }
                Ok(Event::Text(text)) => {
                    if let (Some(f), Some(tp)) = (field, current.as_mut()) {
                        let text = text
                            .unescape()
                            .map_err(|e| TrackError::parse(source_id, e.to_string()))?;
                        tp.set(source_id, f, &text)?;
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.local_name();
                    if name.as_ref() == b"Trackpoint" {
                        field = None;
                        if let Some(tp) = current.take() {
                            match tp.finish() {
                                Some(sample) => samples.push(sample),
                                None => incomplete += 1,
                            }
                        }
                    } else if Field::from_tag(name.as_ref()).is_some() {
                        field = None;
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
            return Err(TrackError::parse(
                source_id,
                "missing <TrainingCenterDatabase> root element",
            ));
        }
        if current.is_some() {
            return Err(TrackError::parse(source_id, "unterminated <Trackpoint>"));
        }

        if incomplete > 0 {
            debug!(
                "[TcxSource] {}: skipped {} trackpoints without time or position",
                source_id, incomplete
            );
        }
        debug!("[TcxSource] {}: {} samples", source_id, samples.len());

        Ok(SourceTrack::new(source_id, samples))
    }
}
