//! Unified error handling for the track-etl library.
//!
//! Every fallible stage of the pipeline returns [`TrackError`]. Some variants
//! are hard stops (an empty trajectory), others describe per-file or per-point
//! problems that the pipeline degrades around according to its configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for track-etl operations.
#[derive(Debug, Error)]
pub enum TrackError {
    /// No source produced a single usable point
    #[error("no track points found in any input source")]
    EmptyInput,

    /// A source file's content does not match its format
    #[error("failed to parse '{source_id}': {message}")]
    Parse { source_id: String, message: String },

    /// File extension does not map to a supported format
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Latitude/longitude outside the valid range, or not a number
    #[error(
        "point {index} of '{source_id}' has invalid coordinates ({latitude}, {longitude})"
    )]
    MalformedCoordinate {
        source_id: String,
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    /// An activity code or join key has no label mapping
    #[error("activity {activity_id} has no type mapping for key '{key}'")]
    UnresolvedActivityType { activity_id: u32, key: String },

    /// The same source identifier was supplied twice
    #[error("source '{0}' appears more than once in the input")]
    DuplicateSource(String),

    /// The external activity metadata table is unusable
    #[error("activity metadata error: {0}")]
    Metadata(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl TrackError {
    /// Build a parse error for the given source.
    pub fn parse(source_id: &str, message: impl Into<String>) -> Self {
        TrackError::Parse {
            source_id: source_id.to_string(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for track-etl operations.
pub type Result<T> = std::result::Result<T, TrackError>;
