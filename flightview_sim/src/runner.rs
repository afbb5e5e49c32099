//! Headless playback runner.
//!
//! Drives a [`FlightViewer`] the way a render loop would: load every input,
//! start playback, call `tick()` once per frame. While running it checks the
//! clock bound and counts wraps, and optionally records an export and
//! streams to Rerun.

use crate::error::SimError;
use crate::exporter::{PlaybackExport, PlaybackFrame};
use crate::scenarios::ScenarioId;
use crate::visualizer::RerunLogger;
use flightview_core::chart::{attack_bands, cursor_time};
use flightview_core::trajectory::TrajectoryMetadata;
use flightview_core::{
    AttackSegment, FlightPoint, FlightViewer, Rgb, TrajectoryPayload, ViewerConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Settings for one headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to play
    pub ticks: u64,

    /// Viewer settings (speed, view mode, segmentation policy)
    pub viewer: ViewerConfig,

    /// Whether every frame is kept for export
    pub record_frames: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            viewer: ViewerConfig::default(),
            record_frames: false,
        }
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// One flight log waiting to be loaded.
#[derive(Debug, Clone)]
pub struct FlightInput {
    pub name: String,
    pub payload: TrajectoryPayload,
}

impl FlightInput {
    pub fn from_points(name: &str, points: Vec<FlightPoint>) -> Self {
        Self {
            name: name.to_string(),
            payload: TrajectoryPayload {
                data: Some(points),
                metadata: None,
            },
        }
    }

    /// Reads a normalizer payload from disk; the file stem becomes the name.
    ///
    /// Only unreadable or non-JSON files fail here. A payload without points
    /// is rejected later, at load time.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|e| SimError::io(&display, e))?;
        let payload = serde_json::from_str(&json).map_err(|source| SimError::Json {
            path: display.clone(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(display);

        Ok(Self { name, payload })
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// Outcome for one loaded trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryReport {
    pub name: String,
    pub color: Rgb,
    pub has_attack_data: bool,
    pub metadata: TrajectoryMetadata,
    pub segments: Vec<AttackSegment>,
}

/// An input the engine refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFailure {
    pub name: String,
    pub reason: String,
}

/// Results of a headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub trajectories: Vec<TrajectoryReport>,
    pub rejected: Vec<LoadFailure>,

    /// Frames played
    pub ticks: u64,

    /// Largest shared index
    pub max_index: usize,

    pub final_time_index: f64,

    /// Times playback looped back to 0
    pub wraps: u64,

    /// Frames where the index exceeded `max_index` (must stay 0)
    pub bound_violations: u64,
}

/// A finished run: the report plus the (possibly frame-less) export.
#[derive(Debug, Clone)]
pub struct PlaybackRun {
    pub report: RunReport,
    pub export: PlaybackExport,
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    pub run: PlaybackRun,
}

// =============================================================================
// RUNNER
// =============================================================================

/// Plays flight logs headlessly.
pub struct PlaybackRunner {
    config: RunConfig,
    logger: RerunLogger,
}

impl PlaybackRunner {
    /// Creates a runner with visualization disabled.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            logger: RerunLogger::disabled(),
        }
    }

    /// Streams the run to Rerun.
    pub fn with_logger(mut self, logger: RerunLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Loads `inputs`, plays `ticks` frames and reports.
    ///
    /// Rejected inputs are recorded and skipped. Fails only when there were
    /// inputs and none of them loaded.
    pub fn run(
        &self,
        source: &str,
        seed: Option<u64>,
        inputs: Vec<FlightInput>,
    ) -> Result<PlaybackRun, SimError> {
        let mut viewer = FlightViewer::new(self.config.viewer.clone());
        let mut rejected = Vec::new();
        let mut first_error = None;

        for (i, input) in inputs.into_iter().enumerate() {
            match viewer.load_payload(input.payload, &input.name, Rgb::palette(i)) {
                Ok(index) => {
                    if let Some(t) = viewer.store().get(index) {
                        self.logger.log_trajectory(index, t);
                    }
                }
                Err(e) => {
                    rejected.push(LoadFailure {
                        name: input.name.clone(),
                        reason: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if viewer.store().is_empty() {
            if let Some(e) = first_error {
                return Err(SimError::Trajectory(e));
            }
        }

        let mut export = PlaybackExport::new(source, seed);
        export.view_mode = viewer.view_mode();
        export.playback_speed = viewer.clock().playback_speed();
        export.attack_bands = attack_bands(viewer.store());

        info!(
            "Playing {} trajectories for {} ticks (max_index={}, speed={})",
            viewer.store().len(),
            self.config.ticks,
            viewer.clock().max_index(),
            viewer.clock().playback_speed()
        );

        viewer.play();
        let mut wraps = 0;
        let mut bound_violations = 0;
        let mut attacks_on = vec![false; viewer.store().len()];

        for tick in 0..self.config.ticks {
            let before = viewer.clock().current_time_index();
            let update = viewer.tick();

            if update.advanced && update.time_index < before {
                wraps += 1;
                debug!("Tick {}: wrapped to index 0", tick);
            }
            if update.time_index > viewer.clock().max_index() as f64 {
                bound_violations += 1;
                warn!(
                    "Tick {}: index {} exceeds max {}",
                    tick,
                    update.time_index,
                    viewer.clock().max_index()
                );
            }

            for aircraft in &update.aircraft {
                let active = aircraft.active_attack.is_some();
                if let Some(was) = attacks_on.get_mut(aircraft.trajectory) {
                    if active && !*was {
                        let name = viewer
                            .store()
                            .get(aircraft.trajectory)
                            .map(|t| t.name.as_str())
                            .unwrap_or_default();
                        let label = aircraft.active_attack.as_deref().unwrap_or_default();
                        debug!("Tick {}: '{}' entered {} segment", tick, name, label);
                        self.logger
                            .log_event("events", &format!("{} entered {}", name, label));
                    }
                    *was = active;
                }
            }

            let log_time = cursor_time(viewer.store(), viewer.clock());
            self.logger.set_time(tick, log_time);
            self.logger.log_frame(&update);

            if self.config.record_frames {
                export.add_frame(PlaybackFrame::from_update(tick, &update, viewer.store(), log_time));
            }
        }

        export.trajectories = viewer.snapshot().trajectories;

        let report = RunReport {
            trajectories: viewer
                .store()
                .iter()
                .map(|t| TrajectoryReport {
                    name: t.name.clone(),
                    color: t.color,
                    has_attack_data: t.has_attack_data(),
                    metadata: t.metadata().clone(),
                    segments: t.attack_segments().to_vec(),
                })
                .collect(),
            rejected,
            ticks: self.config.ticks,
            max_index: viewer.clock().max_index(),
            final_time_index: viewer.clock().current_time_index(),
            wraps,
            bound_violations,
        };

        Ok(PlaybackRun { report, export })
    }

    /// Generates a scenario from `seed`, plays it and checks the expected
    /// segmentation.
    pub fn run_scenario(&self, scenario: ScenarioId, seed: u64) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), seed);

        let inputs = scenario.build(seed)?;
        let run = self.run(scenario.name(), Some(seed), inputs)?;

        let expected = scenario.expected_segments(self.config.viewer.segmentation.type_change);
        let failure_reason = check_run(&run.report, &expected);

        match &failure_reason {
            None => info!("Scenario {} passed", scenario.name()),
            Some(reason) => warn!("Scenario {} failed: {}", scenario.name(), reason),
        }

        Ok(ScenarioResult {
            scenario,
            seed,
            passed: failure_reason.is_none(),
            failure_reason,
            run,
        })
    }
}

/// First broken expectation of a run, if any.
fn check_run(report: &RunReport, expected_segments: &[usize]) -> Option<String> {
    if !report.rejected.is_empty() {
        return Some(format!("{} input(s) rejected", report.rejected.len()));
    }
    if report.trajectories.len() != expected_segments.len() {
        return Some(format!(
            "expected {} trajectories, loaded {}",
            expected_segments.len(),
            report.trajectories.len()
        ));
    }
    if report.bound_violations > 0 {
        return Some(format!(
            "time index exceeded max_index on {} frame(s)",
            report.bound_violations
        ));
    }

    for (t, &expected) in report.trajectories.iter().zip(expected_segments) {
        if t.segments.len() != expected {
            return Some(format!(
                "'{}': expected {} attack segment(s), found {}",
                t.name,
                expected,
                t.segments.len()
            ));
        }
        if t
            .segments
            .windows(2)
            .any(|w| w[1].start_index <= w[0].end_index)
        {
            return Some(format!("'{}': segments overlap or are unordered", t.name));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightview_core::TypeChangePolicy;

    fn short_run() -> RunConfig {
        RunConfig {
            ticks: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_every_scenario_passes() {
        let runner = PlaybackRunner::new(short_run());
        for scenario in ScenarioId::all() {
            let result = runner.run_scenario(scenario, 42).unwrap();
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_split_policy_separates_handover() {
        let mut config = short_run();
        config.viewer.segmentation.type_change = TypeChangePolicy::Split;
        let result = PlaybackRunner::new(config)
            .run_scenario(ScenarioId::Mixed, 7)
            .unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        let types: Vec<_> = result.run.report.trajectories[0]
            .segments
            .iter()
            .map(|s| s.attack_type.as_str())
            .collect();
        assert_eq!(types, vec!["GPS_SPOOF", "VELOCITY_DRIFT", "JAMMING", "REPLAY"]);
    }

    #[test]
    fn test_overwrite_policy_relabels_handover() {
        let result = PlaybackRunner::new(short_run())
            .run_scenario(ScenarioId::Mixed, 7)
            .unwrap();

        let segments = &result.run.report.trajectories[0].segments;
        assert_eq!(segments[2].attack_type, "REPLAY");
        assert_eq!(segments[2].start_index, 350);
        assert_eq!(segments[2].end_index, 420);
    }

    #[test]
    fn test_playback_wraps_without_exceeding_bound() {
        let mut config = short_run();
        config.ticks = 200;
        config.viewer.initial_speed = 5.0;
        let points = (0..20)
            .map(|i| FlightPoint::new(i as f64, i as f64, 0.0, -10.0))
            .collect();

        let run = PlaybackRunner::new(config)
            .run("unit", None, vec![FlightInput::from_points("short", points)])
            .unwrap();

        assert_eq!(run.report.max_index, 19);
        assert!(run.report.wraps > 0);
        assert_eq!(run.report.bound_violations, 0);
        assert!(run.export.frames.is_empty());
    }

    #[test]
    fn test_rejected_inputs_are_reported() {
        let inputs = vec![
            FlightInput::from_points("good", vec![FlightPoint::new(0.0, 0.0, 0.0, -1.0)]),
            FlightInput::from_points("empty", Vec::new()),
            FlightInput {
                name: "missing".to_string(),
                payload: TrajectoryPayload::default(),
            },
        ];

        let run = PlaybackRunner::new(short_run()).run("unit", None, inputs).unwrap();
        assert_eq!(run.report.trajectories.len(), 1);
        assert_eq!(run.report.rejected.len(), 2);
        assert_eq!(run.report.rejected[0].name, "empty");
    }

    #[test]
    fn test_all_rejected_is_an_error() {
        let inputs = vec![FlightInput::from_points("empty", Vec::new())];
        let err = PlaybackRunner::new(short_run()).run("unit", None, inputs);
        assert!(matches!(err, Err(SimError::Trajectory(_))));
    }

    #[test]
    fn test_recorded_frames() {
        let mut config = short_run();
        config.record_frames = true;
        config.ticks = 10;

        let result = PlaybackRunner::new(config)
            .run_scenario(ScenarioId::GpsSpoof, 1)
            .unwrap();
        let export = &result.run.export;

        assert_eq!(export.frames.len(), 10);
        assert_eq!(export.seed, Some(1));
        assert_eq!(export.attack_bands.len(), 1);
        assert_eq!(export.frames[9].aircraft[0].point_index, 10);
    }
}
