//! Command-line driver for the track ETL pipeline.
//!
//! Usage:
//! ```bash
//! # Enrich every GPX/TCX file in an export directory
//! track-etl ./export
//!
//! # Label activities from the export's activities.csv instead of filenames
//! track-etl ./export --policy join
//!
//! # Fail on the first broken file and keep a JSON run summary
//! track-etl ./export --on-parse-error abort --summary-json run.json -v
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use track_etl::geo_utils::EARTH_RADIUS_KM;
use track_etl::{
    load_activity_metadata, process_directory, write_csv, ActivityTypePolicy,
    ParseFailurePolicy, PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "track-etl",
    version,
    about = "Merge GPX/TCX activity exports into one enriched CSV table"
)]
struct Args {
    /// Directory holding the .gpx/.tcx files
    input_dir: PathBuf,

    /// Output CSV [default: INPUT_DIR/my_activities.csv]
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// How activities get their type label
    #[arg(long, value_enum, default_value_t = PolicyArg::Filename)]
    policy: PolicyArg,

    /// Activity metadata CSV for the join policy [default: INPUT_DIR/activities.csv]
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Filename substring that marks a ride under the filename policy
    #[arg(long, default_value = "Ride")]
    ride_token: String,

    /// Seconds above which a segment counts as a pause
    #[arg(long, default_value_t = 180.0)]
    pause_threshold: f64,

    /// Sphere radius for haversine distance, in km
    #[arg(long, default_value_t = EARTH_RADIUS_KM)]
    earth_radius: f64,

    /// What to do with files that fail to parse
    #[arg(long, value_enum, default_value_t = ParseErrorArg::Skip)]
    on_parse_error: ParseErrorArg,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Ride if the file name contains the ride token, otherwise Run
    Filename,
    /// Activity code embedded in the GPX track
    Code,
    /// Inner join on the activity metadata CSV
    Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParseErrorArg {
    Skip,
    Abort,
}

impl From<ParseErrorArg> for ParseFailurePolicy {
    fn from(arg: ParseErrorArg) -> Self {
        match arg {
            ParseErrorArg::Skip => ParseFailurePolicy::Skip,
            ParseErrorArg::Abort => ParseFailurePolicy::Abort,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let activity_type_policy = match args.policy {
        PolicyArg::Filename => ActivityTypePolicy::FilenameHeuristic {
            token: args.ride_token.clone(),
            matched_label: "Ride".to_string(),
            fallback_label: "Run".to_string(),
        },
        PolicyArg::Code => ActivityTypePolicy::embedded_code(),
        PolicyArg::Join => {
            let path = args
                .metadata
                .clone()
                .unwrap_or_else(|| args.input_dir.join("activities.csv"));
            let table = load_activity_metadata(&path)
                .with_context(|| format!("loading activity metadata from {}", path.display()))?;
            info!("Loaded {} activity labels from {}", table.len(), path.display());
            ActivityTypePolicy::external_join(table)
        }
    };

    let config = PipelineConfig {
        pause_threshold_secs: args.pause_threshold,
        earth_radius_km: args.earth_radius,
        parse_failure_policy: args.on_parse_error.into(),
        activity_type_policy,
    };

    let output = process_directory(&args.input_dir, &config)
        .with_context(|| format!("processing {}", args.input_dir.display()))?;

    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input_dir.join("my_activities.csv"));
    write_csv(&out_path, &output.rows)
        .with_context(|| format!("writing {}", out_path.display()))?;

    let report = &output.report;
    if !report.skipped_files.is_empty() {
        warn!(
            "{} files skipped: {}",
            report.skipped_files.len(),
            report.skipped_files.join(", ")
        );
    }
    if report.activity_types.unresolved() > 0 {
        warn!(
            "{} activities without a mapped type ({} dropped)",
            report.activity_types.unresolved(),
            report.activity_types.dropped_activities
        );
    }
    info!(
        "{} rows, {} activities ({} policy) -> {}",
        report.rows,
        report.activities,
        config.activity_type_policy.name(),
        out_path.display()
    );

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(report).context("serializing run summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }

    Ok(())
}
