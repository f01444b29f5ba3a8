use argh::FromArgs;
use std::path::PathBuf;

use y2m::{JsonLinesSource, Report, Stabilizer, StabilizerConfig};

#[derive(FromArgs)]
/// Replay a recorded detection stream into a rerun viewer
struct Args {
    /// path to the detections, one JSON array per frame
    #[argh(option)]
    jsonl: PathBuf,

    /// number of detections kept in the window
    #[argh(option, default = "5")]
    window_capacity: usize,

    /// frames between two state evaluations
    #[argh(option, default = "5")]
    evaluation_interval: u64,

    /// frames between two heartbeat reports
    #[argh(option, default = "30")]
    heartbeat_interval: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let rec = rerun::RecordingStreamBuilder::new("Y2M Drowsiness Replay").spawn()?;

    let mut stabilizer = Stabilizer::new(StabilizerConfig {
        window_capacity: args.window_capacity,
        evaluation_interval: args.evaluation_interval,
        heartbeat_interval: args.heartbeat_interval,
    });

    for frame in JsonLinesSource::open(&args.jsonl)? {
        let report = stabilizer.ingest(frame?);
        rec.set_time_sequence("frame", stabilizer.frame_count() as i64);

        // the window is logged every frame, reports only when emitted
        let summary = stabilizer.summary();
        if let Some(avg) = summary.avg_confidence {
            rec.log("window/avg_confidence", &rerun::Scalar::new(avg as f64))?;
        }
        rec.log(
            "window/drowsy",
            &rerun::Scalar::new(summary.drowsy_count as f64),
        )?;
        rec.log(
            "window/alert",
            &rerun::Scalar::new(summary.alert_count as f64),
        )?;

        if let Some(report) = report {
            let level = match report {
                Report::State { .. } => rerun::TextLogLevel::INFO,
                Report::NoDetection { .. } => rerun::TextLogLevel::WARN,
            };
            rec.log(
                "reports",
                &rerun::TextLog::new(report.to_string()).with_level(level),
            )?;
        }
    }

    Ok(())
}
