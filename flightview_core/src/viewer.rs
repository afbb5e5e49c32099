//! Viewer context - orchestrates the engine components for one scene.
//!
//! `FlightViewer` is the explicit context object the render loop drives: it
//! owns the trajectory store, the animation clock, one aircraft pose per
//! trajectory and the camera. All mutation goes through `&mut self`, so the
//! single-writer rule holds by construction.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      FlightViewer                        │
//! │  ┌─────────────────┐   ┌──────────────────────────────┐  │
//! │  │ TrajectoryStore │   │ AnimationClock               │  │
//! │  │  • points       │   │  • playing / index / speed   │  │
//! │  │  • render pts   │   └──────────────┬───────────────┘  │
//! │  │  • segments     │                  │ tick()           │
//! │  └────────┬────────┘                  ▼                  │
//! │           │            ┌──────────────────────────────┐  │
//! │           └──────────► │ Pose updater + camera modes  │  │
//! │                        └──────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flightview_core::{FlightViewer, ViewerConfig, Rgb};
//!
//! let mut viewer = FlightViewer::new(ViewerConfig::default());
//! viewer.load_trajectory(points, "flight_01", Rgb::palette(0))?;
//! viewer.play();
//!
//! // Once per render frame
//! let frame = viewer.tick();
//! ```

use crate::camera::{camera_for, CameraConfig, CameraPose, ViewMode};
use crate::error::TrajectoryError;
use crate::playback::{AnimationClock, AnimationState};
use crate::point::FlightPoint;
use crate::pose::{update_pose, AircraftPose};
use crate::segmentation::{AttackedParameter, DeviationSource, SegmentationConfig};
use crate::trajectory::{Rgb, Trajectory, TrajectoryMetadata, TrajectoryPayload, TrajectoryStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for a viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub segmentation: SegmentationConfig,

    /// Playback speed the clock starts with (indices per frame)
    pub initial_speed: f64,

    pub initial_view: ViewMode,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            segmentation: SegmentationConfig::default(),
            initial_speed: 1.0,
            initial_view: ViewMode::Free,
        }
    }
}

/// Info-panel readout for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointInspection {
    pub trajectory: String,
    pub index: usize,
    pub time: f64,
    pub position_n: f64,
    pub position_e: f64,
    /// Raw altitude (meters, unscaled)
    pub altitude: f64,
    pub velocity: Option<f64>,
    pub phi: Option<f64>,
    pub theta: Option<f64>,
    pub psi: Option<f64>,
    pub attack: Option<AttackInfo>,
}

/// Attack segment details for an inspected point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackInfo {
    pub attack_type: String,
    pub max_deviation: f64,
    pub deviation_source: DeviationSource,
    pub affected_parameters: Vec<AttackedParameter>,
    pub start_time: f64,
    pub end_time: f64,
}

/// Per-trajectory state after a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftFrame {
    pub trajectory: usize,
    pub point_index: usize,
    pub pose: AircraftPose,
    /// Type of the attack segment under the aircraft, if any
    pub active_attack: Option<String>,
}

/// Outcome of one [`FlightViewer::tick`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub time_index: f64,
    pub advanced: bool,
    pub aircraft: Vec<AircraftFrame>,
    pub camera: CameraPose,
}

/// List-row view of a loaded trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub name: String,
    pub color: Rgb,
    pub visible: bool,
    pub has_attack_data: bool,
    pub metadata: TrajectoryMetadata,
}

/// Read-only snapshot for UI binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub animation: AnimationState,
    pub max_index: usize,
    pub view_mode: ViewMode,
    pub camera: CameraPose,
    pub trajectories: Vec<TrajectorySummary>,
}

/// One scene: trajectories, playback, aircraft and camera.
pub struct FlightViewer {
    config: ViewerConfig,
    store: TrajectoryStore,
    clock: AnimationClock,
    /// Index-aligned with the store
    poses: Vec<AircraftPose>,
    camera: CameraPose,
    view_mode: ViewMode,
}

impl FlightViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            store: TrajectoryStore::with_config(config.segmentation.clone()),
            clock: AnimationClock::with_speed(config.initial_speed),
            poses: Vec::new(),
            camera: CameraPose::default(),
            view_mode: config.initial_view,
            config,
        }
    }

    // ========== Trajectory set ==========

    /// Loads a trajectory and places its aircraft at the current index.
    pub fn load_trajectory(
        &mut self,
        points: Vec<FlightPoint>,
        name: &str,
        color: Rgb,
    ) -> Result<usize, TrajectoryError> {
        let index = self.store.add_trajectory(points, name, color)?;
        self.poses.push(AircraftPose::default());
        self.on_trajectory_set_changed();
        Ok(index)
    }

    /// Loads a normalizer payload.
    pub fn load_payload(
        &mut self,
        payload: TrajectoryPayload,
        name: &str,
        color: Rgb,
    ) -> Result<usize, TrajectoryError> {
        let points = payload.into_points(name)?;
        self.load_trajectory(points, name, color)
    }

    /// Drops every trajectory and resets playback to index 0, paused.
    pub fn clear(&mut self) {
        self.store.clear();
        self.poses.clear();
        self.clock.reset();
        info!("Cleared all trajectories");
    }

    /// Shows or hides one trajectory.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<(), TrajectoryError> {
        self.store.set_visible(index, visible)?;
        self.on_trajectory_set_changed();
        Ok(())
    }

    fn on_trajectory_set_changed(&mut self) {
        self.clock.set_max_index(self.store.max_index());
        self.apply_frame();
    }

    // ========== Transport ==========

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle_playback(&mut self) {
        self.clock.toggle();
    }

    /// Scrubs to `index` and re-applies poses immediately.
    pub fn seek(&mut self, index: f64) {
        self.clock.seek(index);
        self.apply_frame();
    }

    pub fn set_speed(&mut self, multiplier: f64) {
        self.clock.set_speed(multiplier);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if mode != self.view_mode {
            debug!("View mode {} -> {}", self.view_mode, mode);
        }
        self.view_mode = mode;
        self.camera = self.compute_camera();
    }

    /// Camera position set by free-form user control.
    pub fn set_free_camera(&mut self, camera: CameraPose) {
        self.camera = camera;
    }

    // ========== Frame loop ==========

    /// Per-frame callback: advances the clock if playing, then updates every
    /// visible aircraft and the camera.
    pub fn tick(&mut self) -> FrameUpdate {
        let advanced = self.clock.tick();
        let aircraft = self.apply_frame();

        FrameUpdate {
            time_index: self.clock.current_time_index(),
            advanced,
            aircraft,
            camera: self.camera,
        }
    }

    /// Re-applies the current index without advancing.
    pub fn refresh(&mut self) -> FrameUpdate {
        let aircraft = self.apply_frame();
        FrameUpdate {
            time_index: self.clock.current_time_index(),
            advanced: false,
            aircraft,
            camera: self.camera,
        }
    }

    fn apply_frame(&mut self) -> Vec<AircraftFrame> {
        let mut frames = Vec::new();

        for (index, trajectory) in self.store.visible() {
            let Some(point_index) = self.clock.frame_index(trajectory.len()) else {
                continue;
            };
            let Some(pose) = self.poses.get_mut(index) else {
                continue;
            };
            if update_pose(pose, trajectory, point_index) {
                frames.push(AircraftFrame {
                    trajectory: index,
                    point_index,
                    pose: *pose,
                    active_attack: trajectory
                        .attack_at(point_index)
                        .map(|s| s.attack_type.clone()),
                });
            }
        }

        self.camera = self.compute_camera();
        frames
    }

    fn compute_camera(&self) -> CameraPose {
        let active = self.active_trajectory();
        let time_index = active
            .and_then(|t| self.clock.frame_index(t.len()))
            .unwrap_or(0);
        camera_for(
            self.view_mode,
            active,
            time_index,
            self.camera,
            &self.config.camera,
        )
    }

    /// The trajectory the trailing camera follows: first visible one.
    pub fn active_trajectory(&self) -> Option<&Trajectory> {
        self.store.visible().map(|(_, t)| t).next()
    }

    // ========== Read-only access ==========

    /// Info-panel readout. `None` for an unknown trajectory or an index past
    /// its end.
    pub fn inspect(&self, trajectory: usize, index: usize) -> Option<PointInspection> {
        let t = self.store.get(trajectory)?;
        let point = t.points().get(index)?;

        let attack = t.attack_at(index).map(|s| AttackInfo {
            attack_type: s.attack_type.clone(),
            max_deviation: s.max_deviation,
            deviation_source: s.deviation_source,
            affected_parameters: s.affected_parameters.iter().copied().collect(),
            start_time: s.start_time,
            end_time: s.end_time,
        });

        Some(PointInspection {
            trajectory: t.name.clone(),
            index,
            time: point.time,
            position_n: point.position_n,
            position_e: point.position_e,
            altitude: point.altitude(),
            velocity: point.velocity,
            phi: point.phi,
            theta: point.theta,
            psi: point.psi,
            attack,
        })
    }

    /// Inspection of a trajectory's point under the shared clock.
    pub fn inspect_current(&self, trajectory: usize) -> Option<PointInspection> {
        let t = self.store.get(trajectory)?;
        let index = self.clock.frame_index(t.len())?;
        self.inspect(trajectory, index)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            animation: self.clock.snapshot(),
            max_index: self.clock.max_index(),
            view_mode: self.view_mode,
            camera: self.camera,
            trajectories: self
                .store
                .iter()
                .map(|t| TrajectorySummary {
                    name: t.name.clone(),
                    color: t.color,
                    visible: t.visible,
                    has_attack_data: t.has_attack_data(),
                    metadata: t.metadata().clone(),
                })
                .collect(),
        }
    }

    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn pose(&self, trajectory: usize) -> Option<&AircraftPose> {
        self.poses.get(trajectory)
    }

    pub fn camera(&self) -> CameraPose {
        self.camera
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

impl Default for FlightViewer {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight(n: usize, step: f64) -> Vec<FlightPoint> {
        (0..n)
            .map(|i| FlightPoint::new(i as f64 * 0.1, i as f64 * step, 0.0, -20.0))
            .collect()
    }

    #[test]
    fn test_load_sets_max_index_and_pose() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(11, 1.0), "a", Rgb::palette(0)).unwrap();
        viewer.load_trajectory(straight(5, 2.0), "b", Rgb::palette(1)).unwrap();

        assert_eq!(viewer.clock().max_index(), 10);
        let pose = viewer.pose(1).unwrap();
        assert_eq!(pose.position, viewer.store().get(1).unwrap().render_points()[0]);
    }

    #[test]
    fn test_shorter_trajectory_holds_last_pose() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(11, 1.0), "long", Rgb::palette(0)).unwrap();
        viewer.load_trajectory(straight(3, 1.0), "short", Rgb::palette(1)).unwrap();
        viewer.seek(7.0);

        let frame = viewer.refresh();
        assert_eq!(frame.aircraft.len(), 2);
        assert_eq!(frame.aircraft[0].point_index, 7);
        assert_eq!(frame.aircraft[1].point_index, 2);
    }

    #[test]
    fn test_tick_advances_and_wraps() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(4, 1.0), "a", Rgb::palette(0)).unwrap();

        let paused = viewer.tick();
        assert!(!paused.advanced);

        viewer.play();
        viewer.set_speed(2.0);
        let frame = viewer.tick();
        assert!(frame.advanced);
        assert_relative_eq!(frame.time_index, 2.0);
        assert_eq!(frame.aircraft[0].point_index, 2);

        let frame = viewer.tick(); // 4.0 >= 3 wraps
        assert_eq!(frame.time_index, 0.0);
    }

    #[test]
    fn test_clear_resets_playback() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(20, 1.0), "a", Rgb::palette(0)).unwrap();
        viewer.play();
        viewer.seek(12.0);

        viewer.clear();
        let snapshot = viewer.snapshot();
        assert!(!snapshot.animation.playing);
        assert_eq!(snapshot.animation.current_time_index, 0.0);
        assert!(snapshot.trajectories.is_empty());
        assert!(viewer.pose(0).is_none());

        // Next frame after a clear has nothing to pose
        let frame = viewer.tick();
        assert!(frame.aircraft.is_empty());
    }

    #[test]
    fn test_hiding_longest_shrinks_range() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(30, 1.0), "long", Rgb::palette(0)).unwrap();
        viewer.load_trajectory(straight(6, 1.0), "short", Rgb::palette(1)).unwrap();
        viewer.seek(20.0);

        viewer.set_visible(0, false).unwrap();
        assert_eq!(viewer.clock().max_index(), 5);
        assert_eq!(viewer.clock().current_time_index(), 5.0);
        assert!(viewer.set_visible(7, true).is_err());
    }

    #[test]
    fn test_trailing_camera_tracks_first_visible() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(10, 3.0), "a", Rgb::palette(0)).unwrap();
        viewer.set_view_mode(ViewMode::Trailing);
        viewer.seek(4.0);

        let target = viewer.store().get(0).unwrap().render_points()[4];
        assert_eq!(viewer.camera().target, target);
        assert_eq!(
            viewer.camera().position,
            target + viewer.config().camera.trailing_offset
        );
    }

    #[test]
    fn test_trailing_with_nothing_visible_is_noop() {
        let mut viewer = FlightViewer::default();
        let before = viewer.camera();
        viewer.set_view_mode(ViewMode::Trailing);
        assert_eq!(viewer.camera(), before);

        viewer.load_trajectory(straight(5, 1.0), "a", Rgb::palette(0)).unwrap();
        viewer.set_view_mode(ViewMode::TopDown);
        let top = viewer.camera();
        viewer.set_visible(0, false).unwrap();
        viewer.set_view_mode(ViewMode::Trailing);
        assert_eq!(viewer.camera(), top);
    }

    #[test]
    fn test_inspect_reports_raw_altitude_and_attack() {
        let mut points = straight(4, 1.0);
        points[2] = points[2].clone().with_attack_type("GPS").with_position_deltas(4.0, 0.0, 0.0);
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(points, "a", Rgb::palette(0)).unwrap();

        let info = viewer.inspect(0, 2).unwrap();
        assert_relative_eq!(info.altitude, 20.0);
        let attack = info.attack.unwrap();
        assert_eq!(attack.attack_type, "GPS");
        assert_relative_eq!(attack.max_deviation, 4.0);
        assert_eq!(attack.affected_parameters, vec![AttackedParameter::PositionN]);

        assert!(viewer.inspect(0, 1).unwrap().attack.is_none());
        assert!(viewer.inspect(0, 4).is_none());
        assert!(viewer.inspect(3, 0).is_none());
    }

    #[test]
    fn test_frame_reports_active_attack() {
        let mut points = straight(5, 1.0);
        for p in points.iter_mut().skip(1).take(2) {
            *p = p.clone().attacked();
        }
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(points, "a", Rgb::palette(0)).unwrap();
        viewer.seek(1.0);

        let frame = viewer.refresh();
        assert_eq!(frame.aircraft[0].active_attack.as_deref(), Some("Unknown"));
        assert_eq!(viewer.inspect_current(0).unwrap().index, 1);
    }

    #[test]
    fn test_failed_load_leaves_scene_untouched() {
        let mut viewer = FlightViewer::default();
        viewer.load_trajectory(straight(3, 1.0), "a", Rgb::palette(0)).unwrap();

        let err = viewer.load_payload(TrajectoryPayload::default(), "broken", Rgb::palette(1));
        assert!(matches!(err, Err(TrajectoryError::MissingData)));
        assert_eq!(viewer.store().len(), 1);
        assert!(viewer.pose(1).is_none());
    }
}
