use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use examguard_core::detection::domain::face_detector::FaceDetector;
use examguard_core::detection::infrastructure::deadline_face_detector::DeadlineFaceDetector;
use examguard_core::detection::infrastructure::recorded_trace::RecordedTrace;
use examguard_core::detection::infrastructure::trace_face_detector::TraceFaceDetector;
use examguard_core::detection::infrastructure::trace_frame_source::TraceFrameSource;
use examguard_core::monitoring::detection_loop::{DetectionLoop, ViolationSink};
use examguard_core::monitoring::domain::stats_aggregator::Stats;
use examguard_core::monitoring::domain::throttle_gate::ThrottleScope;
use examguard_core::monitoring::domain::violation::{Violation, ViolationCategory};
use examguard_core::monitoring::monitor_logger::StdoutMonitorLogger;
use examguard_core::monitoring::monitoring_engine::MonitoringEngine;
use examguard_core::shared::settings::MonitorSettings;

/// Extra time allowed beyond the trace's own duration before giving up.
const REPLAY_GRACE: Duration = Duration::from_secs(10);

/// Replay a recorded face-detection trace through the integrity-violation engine.
#[derive(Parser)]
#[command(name = "examguard")]
struct Cli {
    /// Recorded detection trace (JSON).
    trace: PathBuf,

    /// Settings file (defaults to the user config directory, then built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay cadence in milliseconds (defaults to the trace's own cadence).
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Fail any single detection that takes longer than this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Throttle each violation category independently.
    #[arg(long)]
    per_category_throttle: bool,

    /// Print stats as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = build_settings(&cli)?;
    let trace = Arc::new(RecordedTrace::load(&cli.trace)?);
    log::info!(
        "Replaying {} frames ({}x{}) from {}",
        trace.len(),
        trace.frame_width,
        trace.frame_height,
        cli.trace.display()
    );

    let source = Box::new(TraceFrameSource::new(trace.clone()));
    let detector = build_detector(trace.clone(), cli.deadline_ms)?;
    let detection_loop = DetectionLoop::new(source, detector, &settings)
        .with_sink(print_violation())
        .with_logger(Box::new(StdoutMonitorLogger::default()));
    let budget = replay_budget(detection_loop.frame_interval(), trace.len());

    let mut engine = MonitoringEngine::spawn(detection_loop)?;
    engine.enable()?;
    let finished = engine.wait_for_exhaustion(budget);
    engine.shutdown();
    if !finished {
        return Err(format!("Replay did not finish within {budget:?}").into());
    }

    let stats = engine.get_stats();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_table(&stats);
    }
    Ok(())
}

fn build_settings(cli: &Cli) -> Result<MonitorSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => MonitorSettings::load_from(path)?,
        None => MonitorSettings::load(),
    };
    if cli.frame_interval_ms.is_some() {
        settings.frame_interval_ms = cli.frame_interval_ms;
    }
    if cli.per_category_throttle {
        settings.throttle_scope = ThrottleScope::PerCategory;
    }
    settings.validate()?;
    Ok(settings)
}

fn build_detector(
    trace: Arc<RecordedTrace>,
    deadline_ms: Option<u64>,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let base: Box<dyn FaceDetector> = Box::new(TraceFaceDetector::new(trace));
    match deadline_ms {
        Some(ms) => Ok(Box::new(DeadlineFaceDetector::new(
            base,
            Duration::from_millis(ms),
        )?)),
        None => Ok(base),
    }
}

/// Nominal replay duration plus grace, saturating instead of overflowing.
fn replay_budget(frame_interval: Duration, frames: usize) -> Duration {
    let frames = u32::try_from(frames).unwrap_or(u32::MAX);
    frame_interval
        .saturating_mul(frames)
        .saturating_add(REPLAY_GRACE)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.trace.exists() {
        return Err(format!("Trace file not found: {}", cli.trace.display()).into());
    }
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(format!("Settings file not found: {}", path.display()).into());
        }
    }
    if cli.frame_interval_ms == Some(0) {
        return Err("Frame interval must be at least 1 ms".into());
    }
    if cli.deadline_ms == Some(0) {
        return Err("Deadline must be at least 1 ms".into());
    }
    Ok(())
}

fn print_violation() -> ViolationSink {
    Box::new(|violation: &Violation| {
        eprintln!(
            "[{:>8}ms] {}: {}",
            violation.timestamp_ms, violation.category, violation.description
        );
    })
}

fn print_table(stats: &Stats) {
    for &category in ViolationCategory::ALL {
        println!("{:<20} {}", category.to_string(), stats.count(category));
    }
    println!("{:<20} {}", "Total", stats.total());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_budget_covers_trace_plus_grace() {
        assert_eq!(
            replay_budget(Duration::from_millis(33), 100),
            Duration::from_millis(3_300) + REPLAY_GRACE
        );
        assert_eq!(replay_budget(Duration::from_millis(33), 0), REPLAY_GRACE);
    }

    #[test]
    fn test_replay_budget_saturates_on_huge_traces() {
        assert_eq!(
            replay_budget(Duration::from_secs(u64::MAX / 2), usize::MAX),
            Duration::MAX
        );
    }
}
