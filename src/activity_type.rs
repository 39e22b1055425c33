//! Activity-type resolution.
//!
//! One policy applies to a whole run:
//!
//! - **Filename heuristic** - a token in the source name picks one label,
//!   everything else gets the fallback (e.g. `"Ride"` / `"Run"`).
//! - **Embedded code** - the per-file code from the GPX `<type>` element is
//!   looked up in a code table; unknown codes pass through as the raw code.
//! - **External join** - the numeric part of the source name is looked up in
//!   an activity metadata table (Strava's `activities.csv`). This is an inner
//!   join: activities with no row are removed from the output.
//!
//! Every activity that cannot be resolved is logged and counted in
//! [`ResolutionReport`].

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{EnrichedPoint, Result, TrackError};

/// Known embedded activity codes (Strava GPX export).
pub const DEFAULT_ACTIVITY_CODES: [(u8, &str); 3] = [(1, "Ride"), (4, "Hike"), (9, "Run")];

/// How activity labels are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityTypePolicy {
    FilenameHeuristic {
        /// Substring searched for in the source name (case-sensitive)
        token: String,
        /// Label when the token is present
        matched_label: String,
        /// Label when it is not
        fallback_label: String,
    },
    EmbeddedCode {
        labels: HashMap<u8, String>,
    },
    ExternalJoin {
        /// Activity number -> label
        table: HashMap<i64, String>,
    },
}

impl Default for ActivityTypePolicy {
    fn default() -> Self {
        Self::filename_heuristic()
    }
}

impl ActivityTypePolicy {
    /// `"Ride"` if the name contains `"Ride"`, otherwise `"Run"`.
    pub fn filename_heuristic() -> Self {
        ActivityTypePolicy::FilenameHeuristic {
            token: "Ride".to_string(),
            matched_label: "Ride".to_string(),
            fallback_label: "Run".to_string(),
        }
    }

    /// Code lookup with [`DEFAULT_ACTIVITY_CODES`].
    pub fn embedded_code() -> Self {
        ActivityTypePolicy::EmbeddedCode {
            labels: DEFAULT_ACTIVITY_CODES
                .iter()
                .map(|&(code, label)| (code, label.to_string()))
                .collect(),
        }
    }

    /// Inner join against an activity metadata table.
    pub fn external_join(table: HashMap<i64, String>) -> Self {
        ActivityTypePolicy::ExternalJoin { table }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ActivityTypePolicy::FilenameHeuristic { .. } => "filename",
            ActivityTypePolicy::EmbeddedCode { .. } => "code",
            ActivityTypePolicy::ExternalJoin { .. } => "join",
        }
    }
}

/// Outcome of labelling a run's activities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Activities that received a mapped label
    pub resolved_activities: usize,
    /// Activities left with a raw or empty label (embedded-code policy)
    pub passthrough_activities: usize,
    /// Activities removed by the inner join
    pub dropped_activities: usize,
    /// Rows removed by the inner join
    pub dropped_rows: usize,
}

impl ResolutionReport {
    /// Activities that did not get a mapped label, however they degraded.
    pub fn unresolved(&self) -> usize {
        self.passthrough_activities + self.dropped_activities
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Label(String),
    Passthrough(String),
    Drop,
}

/// Label every row according to `policy`, dropping unmatched activities under
/// the external-join policy.
///
/// Labels are decided once per activity from its first row; row order and
/// activity ids are left untouched, so a dropped activity leaves a gap in the
/// id sequence.
pub fn resolve_activity_types(
    rows: Vec<EnrichedPoint>,
    policy: &ActivityTypePolicy,
) -> (Vec<EnrichedPoint>, ResolutionReport) {
    let mut report = ResolutionReport::default();
    let mut decisions: HashMap<u32, Resolution> = HashMap::new();

    for row in &rows {
        if decisions.contains_key(&row.activity_id) {
            continue;
        }
        let resolution = resolve_one(
            policy,
            row.activity_id,
            &row.record.source_id,
            row.record.raw_activity_code,
        );
        match &resolution {
            Resolution::Label(_) => report.resolved_activities += 1,
            Resolution::Passthrough(_) => report.passthrough_activities += 1,
            Resolution::Drop => report.dropped_activities += 1,
        }
        decisions.insert(row.activity_id, resolution);
    }

    let total_rows = rows.len();
    let labelled: Vec<EnrichedPoint> = rows
        .into_iter()
        .filter_map(|mut row| match decisions.get(&row.activity_id) {
            Some(Resolution::Label(label)) | Some(Resolution::Passthrough(label)) => {
                row.activity_type = label.clone();
                Some(row)
            }
            Some(Resolution::Drop) | None => None,
        })
        .collect();
    report.dropped_rows = total_rows - labelled.len();

    if report.unresolved() > 0 {
        warn!(
            "[ActivityType] policy={}: {} passthrough, {} dropped activities ({} rows)",
            policy.name(),
            report.passthrough_activities,
            report.dropped_activities,
            report.dropped_rows
        );
    }
    debug!(
        "[ActivityType] policy={}: {} activities resolved",
        policy.name(),
        report.resolved_activities
    );

    (labelled, report)
}

fn resolve_one(
    policy: &ActivityTypePolicy,
    activity_id: u32,
    source_id: &str,
    code: Option<u8>,
) -> Resolution {
    match policy {
        ActivityTypePolicy::FilenameHeuristic {
            token,
            matched_label,
            fallback_label,
        } => {
            if source_id.contains(token.as_str()) {
                Resolution::Label(matched_label.clone())
            } else {
                Resolution::Label(fallback_label.clone())
            }
        }
        ActivityTypePolicy::EmbeddedCode { labels } => {
            let key = code.map(|c| c.to_string()).unwrap_or_default();
            match code.and_then(|c| labels.get(&c)) {
                Some(label) => Resolution::Label(label.clone()),
                None => {
                    warn!(
                        "[ActivityType] {} ({}): {}",
                        source_id,
                        if code.is_some() { "passing raw code through" } else { "no embedded code" },
                        TrackError::UnresolvedActivityType {
                            activity_id,
                            key: key.clone(),
                        }
                    );
                    Resolution::Passthrough(key)
                }
            }
        }
        ActivityTypePolicy::ExternalJoin { table } => {
            let number = parse_activity_number(source_id);
            match number.and_then(|n| table.get(&n)) {
                Some(label) => Resolution::Label(label.clone()),
                None => {
                    warn!(
                        "[ActivityType] {} dropped: {}",
                        source_id,
                        TrackError::UnresolvedActivityType {
                            activity_id,
                            key: number.map(|n| n.to_string()).unwrap_or_default(),
                        }
                    );
                    Resolution::Drop
                }
            }
        }
    }
}

/// Numeric activity identifier from a source name such as `"1573284.gpx"`.
///
/// The `.gpx`/`.tcx` extension is stripped; a fully numeric stem is used as
/// is, otherwise the first run of digits in it.
///
/// ```
/// use track_etl::activity_type::parse_activity_number;
///
/// assert_eq!(parse_activity_number("1573284.gpx"), Some(1573284));
/// assert_eq!(parse_activity_number("activity_2039.TCX"), Some(2039));
/// assert_eq!(parse_activity_number("Morning_Run.gpx"), None);
/// ```
pub fn parse_activity_number(source_id: &str) -> Option<i64> {
    let lower = source_id.to_ascii_lowercase();
    let stem = if lower.ends_with(".gpx") || lower.ends_with(".tcx") {
        &source_id[..source_id.len() - 4]
    } else {
        source_id
    };

    if let Ok(n) = stem.trim().parse::<i64>() {
        return Some(n);
    }

    let start = stem.find(|c: char| c.is_ascii_digit())?;
    let digits: String = stem[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// =============================================================================
// Activity metadata table
// =============================================================================

#[derive(Debug, Deserialize)]
struct MetadataRow {
    #[serde(alias = "Activity ID")]
    id: i64,
    #[serde(rename = "type", alias = "Activity Type")]
    activity_type: String,
}

/// Load an `id -> type` table from an activity metadata CSV.
///
/// The file needs an `id` and a `type` column (Strava's `Activity ID` and
/// `Activity Type` headers are accepted too); other columns are ignored.
/// When an id repeats, the first row wins.
pub fn load_activity_metadata(path: &Path) -> Result<HashMap<i64, String>> {
    let file = std::fs::File::open(path).map_err(|e| TrackError::io(path, e))?;
    load_activity_metadata_from_reader(file)
        .map_err(|e| TrackError::Metadata(format!("{}: {}", path.display(), e)))
}

/// Same as [`load_activity_metadata`] for any reader.
pub fn load_activity_metadata_from_reader<R: Read>(reader: R) -> Result<HashMap<i64, String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = HashMap::new();
    for row in csv_reader.deserialize::<MetadataRow>() {
        let row = row?;
        table.entry(row.id).or_insert(row.activity_type);
    }

    debug!("[ActivityType] Loaded {} metadata rows", table.len());
    Ok(table)
}
