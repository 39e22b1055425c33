//! Enrich two in-memory tracks and print the resulting table.
//!
//! Run with: cargo run --example enrich_in_memory

use chrono::{Duration, TimeZone, Utc};
use track_etl::{run, write_csv_to, PipelineConfig, RawSample, SourceTrack};

fn main() {
    let t0 = Utc.with_ymd_and_hms(2018, 6, 25, 7, 0, 0).unwrap();

    // Morning ride around London, with a 10 minute stop before the last point
    let ride = SourceTrack::new(
        "Morning_Ride.gpx",
        vec![
            RawSample::new(t0, 51.5074, -0.1278, Some(11.0)),
            RawSample::new(t0 + Duration::seconds(10), 51.5080, -0.1290, Some(12.0)),
            RawSample::new(t0 + Duration::seconds(20), 51.5090, -0.1300, Some(12.5)),
            RawSample::new(t0 + Duration::seconds(620), 51.5100, -0.1310, Some(13.0)),
        ],
    );

    // Evening run in New York
    let t1 = t0 + Duration::hours(10);
    let run_track = SourceTrack::new(
        "Evening_Run.tcx",
        vec![
            RawSample::new(t1, 40.7128, -74.0060, None),
            RawSample::new(t1 + Duration::seconds(5), 40.7138, -74.0070, None),
            RawSample::new(t1 + Duration::seconds(10), 40.7148, -74.0080, None),
        ],
    );

    let config = PipelineConfig::default();
    let output = run(vec![ride, run_track], &config).unwrap();

    println!("Track ETL Example\n");
    println!(
        "Config: pause_threshold={}s, earth_radius={}km, policy={}\n",
        config.pause_threshold_secs,
        config.earth_radius_km,
        config.activity_type_policy.name()
    );

    for row in &output.rows {
        println!(
            "   #{} {:<18} {:>2}  {:>7.4} km  {:>5.0} s  [{}]{}",
            row.activity_id,
            row.record.source_id,
            row.record.sequence_index,
            row.cum_distance_km,
            row.cum_time_seconds,
            row.activity_type,
            if row.is_activity_start { "  start" } else { "" }
        );
    }

    println!(
        "\n{} activities, {} paused segments\n",
        output.report.activities, output.report.gaps.paused_segments
    );

    println!("CSV:");
    write_csv_to(std::io::stdout(), &output.rows).unwrap();
}
