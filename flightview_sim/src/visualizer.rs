//! Rerun visualization for playback runs.
//!
//! Visualization is optional and only available with the `visualization`
//! feature; without it every method is a no-op.
//!
//! # What Gets Logged
//!
//! - Each trajectory as a line strip in its identity color (static)
//! - Attack segments as red line strips over the trajectory (static)
//! - Aircraft positions plus a forward arrow per frame
//! - Active attack labels as text events

use flightview_core::viewer::FrameUpdate;
use flightview_core::Trajectory;

#[cfg(feature = "visualization")]
use rerun::{Color, Position3D, Radius, RecordingStream};

/// Rerun logger for playback visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to follow playback");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the frame counter and log time for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_time(&self, tick: u64, log_time: Option<f64>) {
        if let Some(ref rec) = self.rec {
            rec.set_time_sequence("tick", tick as i64);
            if let Some(seconds) = log_time {
                rec.set_time_seconds("log_time", seconds);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_time(&self, _tick: u64, _log_time: Option<f64>) {}

    /// Logs a trajectory's path and attack segments.
    #[cfg(feature = "visualization")]
    pub fn log_trajectory(&self, index: usize, trajectory: &Trajectory) {
        if let Some(ref rec) = self.rec {
            let strip: Vec<[f32; 3]> = trajectory
                .render_points()
                .iter()
                .map(|p| [p.x as f32, p.y as f32, p.z as f32])
                .collect();
            let [r, g, b] = trajectory.color.0;

            let _ = rec.log_static(
                format!("world/trajectories/{}/path", index),
                &rerun::LineStrips3D::new([strip.clone()])
                    .with_colors([Color::from_rgb(r, g, b)])
                    .with_radii([Radius::new_scene_units(0.3)]),
            );

            let segments: Vec<Vec<[f32; 3]>> = trajectory
                .attack_segments()
                .iter()
                .map(|s| strip[s.start_index..=s.end_index].to_vec())
                .collect();
            if !segments.is_empty() {
                let _ = rec.log_static(
                    format!("world/trajectories/{}/attacks", index),
                    &rerun::LineStrips3D::new(segments)
                        .with_colors([Color::from_rgb(255, 50, 50)])
                        .with_radii([Radius::new_scene_units(0.6)]),
                );
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_trajectory(&self, _index: usize, _trajectory: &Trajectory) {}

    /// Logs aircraft poses and the camera target for one frame.
    #[cfg(feature = "visualization")]
    pub fn log_frame(&self, update: &FrameUpdate) {
        if let Some(ref rec) = self.rec {
            for aircraft in &update.aircraft {
                let p = aircraft.pose.position;
                let f = aircraft.pose.forward() * 5.0;
                let base = format!("world/aircraft/{}", aircraft.trajectory);

                let color = if aircraft.active_attack.is_some() {
                    Color::from_rgb(255, 50, 50)
                } else {
                    Color::from_rgb(255, 255, 255)
                };
                let _ = rec.log(
                    base.as_str(),
                    &rerun::Points3D::new([Position3D::new(p.x as f32, p.y as f32, p.z as f32)])
                        .with_colors([color])
                        .with_radii([Radius::new_scene_units(1.5)]),
                );
                let _ = rec.log(
                    format!("{}/heading", base),
                    &rerun::Arrows3D::from_vectors([[f.x as f32, f.y as f32, f.z as f32]])
                        .with_origins([[p.x as f32, p.y as f32, p.z as f32]]),
                );
            }

            let target = update.camera.target;
            let _ = rec.log(
                "world/camera_target",
                &rerun::Points3D::new([Position3D::new(
                    target.x as f32,
                    target.y as f32,
                    target.z as f32,
                )])
                .with_colors([Color::from_rgb(0, 212, 255)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_frame(&self, _update: &FrameUpdate) {}

    /// Logs a text annotation (e.g. attack onset).
    #[cfg(feature = "visualization")]
    pub fn log_event(&self, path: &str, message: &str) {
        if let Some(ref rec) = self.rec {
            let _ = rec.log(path, &rerun::TextLog::new(message));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_event(&self, _path: &str, _message: &str) {}
}
