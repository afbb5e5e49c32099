//! JSON exporter for headless playback runs.
//!
//! Records what a render loop would have drawn on every tick (aircraft
//! poses, camera placement, active attacks) plus the chart attack bands, so
//! a run can be replayed or plotted outside the engine.

use flightview_core::chart::AttackBand;
use flightview_core::viewer::{FrameUpdate, TrajectorySummary};
use flightview_core::{TrajectoryStore, ViewMode};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn xyz(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

/// A single frame of playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackFrame {
    /// Frame counter since the run started
    pub tick: u64,

    /// Shared (fractional) time index after the tick
    pub time_index: f64,

    /// Log time under the chart cursor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_time: Option<f64>,

    pub aircraft: Vec<AircraftState>,

    pub camera: CameraState,
}

/// Pose of one aircraft in render space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftState {
    pub trajectory: String,
    pub point_index: usize,
    pub position: [f64; 3],

    /// Roll, pitch, yaw (radians)
    pub attitude: [f64; 3],

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_attack: Option<String>,
}

/// Camera placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraState {
    pub position: [f64; 3],
    pub target: [f64; 3],
}

impl PlaybackFrame {
    /// Flattens a viewer frame; trajectory indices become names.
    pub fn from_update(
        tick: u64,
        update: &FrameUpdate,
        store: &TrajectoryStore,
        log_time: Option<f64>,
    ) -> Self {
        let aircraft = update
            .aircraft
            .iter()
            .map(|a| {
                let (roll, pitch, yaw) = a.pose.attitude();
                AircraftState {
                    trajectory: store
                        .get(a.trajectory)
                        .map(|t| t.name.clone())
                        .unwrap_or_default(),
                    point_index: a.point_index,
                    position: xyz(&a.pose.position),
                    attitude: [roll, pitch, yaw],
                    active_attack: a.active_attack.clone(),
                }
            })
            .collect();

        Self {
            tick,
            time_index: update.time_index,
            log_time,
            aircraft,
            camera: CameraState {
                position: xyz(&update.camera.position),
                target: xyz(&update.camera.target),
            },
        }
    }
}

/// Complete playback export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackExport {
    /// Scenario name or input file list
    pub source: String,

    /// Seed used for synthetic input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub view_mode: ViewMode,
    pub playback_speed: f64,

    pub trajectories: Vec<TrajectorySummary>,

    /// Attack spans of every visible trajectory
    pub attack_bands: Vec<AttackBand>,

    /// All frames
    pub frames: Vec<PlaybackFrame>,
}

impl PlaybackExport {
    /// Creates a new export container.
    pub fn new(source: &str, seed: Option<u64>) -> Self {
        Self {
            source: source.to_string(),
            seed,
            view_mode: ViewMode::default(),
            playback_speed: 1.0,
            trajectories: Vec::new(),
            attack_bands: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: PlaybackFrame) {
        self.frames.push(frame);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
