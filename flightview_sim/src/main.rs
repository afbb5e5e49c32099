//! FlightView CLI
//!
//! Loads flight logs (JSON payloads or a seeded synthetic scenario), plays
//! them headlessly and reports trajectory metadata and attack segments.

use clap::Parser;
use flightview_core::{TypeChangePolicy, ViewMode};
use flightview_sim::runner::{PlaybackRun, RunReport};
use flightview_sim::{FlightInput, PlaybackRunner, RerunLogger, RunConfig, ScenarioId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "flightview")]
#[command(about = "Headless trajectory playback and attack segmentation", long_about = None)]
struct Args {
    /// Normalized JSON payload to load (repeatable); overrides --scenario
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Scenario to generate (clean, gps_spoof, velocity_drift, mixed, formation, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Seed for synthetic flights (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Frames to play
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// Playback speed (indices per frame)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Camera view mode (top-down, side, trailing, free)
    #[arg(long, default_value = "free")]
    view: ViewMode,

    /// Start a new segment when the attack type changes mid-run
    #[arg(long)]
    split_on_type_change: bool,

    /// Write per-frame poses, camera and attacks to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Stream the run to Rerun (needs the `visualization` feature)
    #[arg(long)]
    rerun: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig {
            ticks: self.ticks,
            record_frames: self.export.is_some(),
            ..Default::default()
        };
        config.viewer.initial_speed = self.speed;
        config.viewer.initial_view = self.view;
        if self.split_on_type_change {
            config.viewer.segmentation.type_change = TypeChangePolicy::Split;
        }
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("FlightView playback v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut runner = PlaybackRunner::new(args.run_config());
    if args.rerun {
        runner = runner.with_logger(RerunLogger::new("flightview"));
    }

    if args.input.is_empty() {
        run_scenarios(&args, &runner)
    } else {
        run_inputs(&args, &runner)
    }
}

/// Plays the `--input` payloads together in one scene.
fn run_inputs(args: &Args, runner: &PlaybackRunner) -> ExitCode {
    let mut inputs = Vec::with_capacity(args.input.len());
    for path in &args.input {
        match FlightInput::from_file(path) {
            Ok(input) => inputs.push(input),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let source = args
        .input
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",");

    let run = match runner.run(&source, None, inputs) {
        Ok(run) => run,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        print_json(&serde_json::json!({ "source": source, "report": run.report }));
    } else {
        log_report(&run.report);
    }

    match &args.export {
        Some(path) if !write_export(&run, path) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

/// Generates and plays one or all scenarios.
fn run_scenarios(args: &Args, runner: &PlaybackRunner) -> ExitCode {
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: clean, gps_spoof, velocity_drift, mixed, formation, all");
                return ExitCode::FAILURE;
            }
        }
    };

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        return ExitCode::FAILURE;
    }

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let mut results = Vec::new();
    for scenario in scenarios {
        match runner.run_scenario(scenario, seed) {
            Ok(result) => {
                if !args.json {
                    log_report(&result.run.report);
                    if result.passed {
                        info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                    } else {
                        error!(
                            "✗ {} (seed={}) FAILED: {}",
                            scenario.name(),
                            seed,
                            result.failure_reason.as_deref().unwrap_or("unknown")
                        );
                    }
                }
                results.push(result);
            }
            Err(e) => {
                error!("✗ {} (seed={}) ERROR: {}", scenario.name(), seed, e);
                return ExitCode::FAILURE;
            }
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        print_json(&serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "failure_reason": r.failure_reason,
                    "report": r.run.report,
                })
            }).collect::<Vec<_>>(),
        }));
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed == 0 {
            info!("✅ All {} scenario runs passed!", results.len());
        } else {
            error!("❌ {}/{} scenario runs failed!", failed, results.len());
        }
    }

    if let (Some(path), Some(result)) = (&args.export, results.first()) {
        if !write_export(&result.run, path) {
            return ExitCode::FAILURE;
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn log_report(report: &RunReport) {
    for failure in &report.rejected {
        error!("Rejected '{}': {}", failure.name, failure.reason);
    }
    for t in &report.trajectories {
        let meta = &t.metadata;
        info!(
            "{} [{}]: {} points, {:.1}s, {:.0}m flown, altitude {:.1}..{:.1}m",
            t.name,
            t.color,
            meta.points_count,
            meta.duration,
            meta.distance,
            meta.altitude_range[0],
            meta.altitude_range[1]
        );
        if !t.has_attack_data {
            info!("  no attack columns");
        }
        for s in &t.segments {
            info!(
                "  {} t={:.1}..{:.1}s ({} pts) max dev {:.1}m [{}]",
                s.attack_type,
                s.start_time,
                s.end_time,
                s.point_count(),
                s.max_deviation,
                s.parameter_list()
            );
        }
    }
    info!(
        "Played {} ticks, final index {:.1}/{}, {} wrap(s)",
        report.ticks, report.final_time_index, report.max_index, report.wraps
    );
}

fn write_export(run: &PlaybackRun, path: &Path) -> bool {
    match run.export.write_to_file(path) {
        Ok(()) => {
            info!(
                "Exported {} frames to {}",
                run.export.frames.len(),
                path.display()
            );
            true
        }
        Err(e) => {
            error!("Failed to write export to {}: {}", path.display(), e);
            false
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize report: {}", e),
    }
}
