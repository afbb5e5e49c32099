//! Trajectory Store - the single owner of loaded flight logs
//!
//! Every loaded log becomes a [`Trajectory`]: its time-sorted points, the
//! index-aligned render-space positions, derived speeds, display settings and
//! attack segments. Other components only ever see `&Trajectory`.

use crate::error::{ColorParseError, TrajectoryError};
use crate::point::FlightPoint;
use crate::segmentation::{
    has_attack_data, segment_attacks, AttackSegment, AttackSummary, Segmentation,
    SegmentationConfig,
};
use crate::transform::{transform, unscaled_distance};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

// =============================================================================
// DISPLAY COLOR
// =============================================================================

/// Identity color of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Distinct colors handed out to trajectories loaded without one.
    pub fn palette(index: usize) -> Self {
        const PALETTE: [Rgb; 6] = [
            Rgb::new(0, 212, 255),  // Cyan
            Rgb::new(255, 165, 0),  // Orange
            Rgb::new(0, 255, 136),  // Green
            Rgb::new(255, 100, 255), // Magenta
            Rgb::new(255, 255, 100), // Yellow
            Rgb::new(100, 100, 255), // Blue
        ];
        PALETTE[index % PALETTE.len()]
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let err = || ColorParseError(s.to_string());
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// The normalizer's response body: `{ "data": [...], "metadata": {...} }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrajectoryPayload {
    #[serde(default)]
    pub data: Option<Vec<FlightPoint>>,

    /// Server-side summary; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TrajectoryPayload {
    /// Parses a JSON body.
    pub fn from_json(json: &str) -> Result<Self, TrajectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Takes the point array, rejecting a missing or empty one.
    pub fn into_points(self, name: &str) -> Result<Vec<FlightPoint>, TrajectoryError> {
        match self.data {
            None => Err(TrajectoryError::MissingData),
            Some(points) if points.is_empty() => Err(TrajectoryError::empty(name)),
            Some(points) => Ok(points),
        }
    }
}

// =============================================================================
// TRAJECTORY
// =============================================================================

/// Summary numbers shown next to a loaded trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMetadata {
    pub points_count: usize,

    /// Raw altitude [min, max] in meters
    pub altitude_range: [f64; 2],

    /// Flown distance in meters, no vertical exaggeration
    pub distance: f64,

    /// Last time minus first time (seconds)
    pub duration: f64,

    pub attack_summary: AttackSummary,
}

impl TrajectoryMetadata {
    fn compute(points: &[FlightPoint], segments: &[AttackSegment]) -> Self {
        let (min_alt, max_alt) = points
            .iter()
            .map(FlightPoint::altitude)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a), hi.max(a))
            });

        let distance = points
            .windows(2)
            .map(|w| unscaled_distance(&w[0], &w[1]))
            .sum();

        let duration = match (points.first(), points.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        };

        Self {
            points_count: points.len(),
            altitude_range: [min_alt, max_alt],
            distance,
            duration,
            attack_summary: AttackSummary::from_segments(segments),
        }
    }
}

/// One loaded flight log.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub name: String,
    pub color: Rgb,
    pub visible: bool,
    points: Vec<FlightPoint>,
    render_points: Vec<Vector3<f64>>,
    has_attack_data: bool,
    segmentation: Segmentation,
    metadata: TrajectoryMetadata,
}

impl Trajectory {
    /// Builds a trajectory from raw points.
    ///
    /// Sorts by time (stable) when needed, derives render positions and any
    /// missing speeds, and segments attacks when the log carries attack data.
    pub fn build(
        mut points: Vec<FlightPoint>,
        name: &str,
        color: Rgb,
        config: &SegmentationConfig,
    ) -> Result<Self, TrajectoryError> {
        if points.is_empty() {
            return Err(TrajectoryError::empty(name));
        }
        if let Some((index, field)) = points
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.non_finite_field().map(|f| (i, f)))
        {
            return Err(TrajectoryError::NonFinite { index, field });
        }

        if points.windows(2).any(|w| w[1].time < w[0].time) {
            debug!("Trajectory '{}' arrived out of time order, sorting", name);
            points.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        let render_points: Vec<Vector3<f64>> = points.iter().map(transform).collect();
        fill_velocities(&mut points, &render_points);

        let has_attack_data = has_attack_data(&points);
        let segmentation = if has_attack_data {
            segment_attacks(&points, config)
        } else {
            Segmentation {
                segments: Vec::new(),
                segment_of: vec![None; points.len()],
            }
        };
        let metadata = TrajectoryMetadata::compute(&points, &segmentation.segments);

        Ok(Self {
            name: name.to_string(),
            color,
            visible: true,
            points,
            render_points,
            has_attack_data,
            segmentation,
            metadata,
        })
    }

    pub fn points(&self) -> &[FlightPoint] {
        &self.points
    }

    /// Render-space positions, index-aligned with [`Trajectory::points`].
    pub fn render_points(&self) -> &[Vector3<f64>] {
        &self.render_points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest valid point index.
    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn has_attack_data(&self) -> bool {
        self.has_attack_data
    }

    pub fn attack_segments(&self) -> &[AttackSegment] {
        &self.segmentation.segments
    }

    /// Segment covering point `index`, if any. Out of range is `None`.
    pub fn attack_at(&self, index: usize) -> Option<&AttackSegment> {
        self.segmentation.segment_at(index)
    }

    pub fn metadata(&self) -> &TrajectoryMetadata {
        &self.metadata
    }
}

/// Fills `velocity` on points that lack it with the finite-difference speed
/// between consecutive render positions. `Δt <= 0` yields 0; the first point
/// inherits the second point's speed.
fn fill_velocities(points: &mut [FlightPoint], render_points: &[Vector3<f64>]) {
    let speed_into = |i: usize, points: &[FlightPoint]| -> f64 {
        let dt = points[i].time - points[i - 1].time;
        if dt <= 0.0 {
            0.0
        } else {
            (render_points[i] - render_points[i - 1]).norm() / dt
        }
    };

    let derived: Vec<f64> = (0..points.len())
        .map(|i| match i {
            0 if points.len() > 1 => points[1].velocity.unwrap_or_else(|| speed_into(1, points)),
            0 => 0.0,
            _ => speed_into(i, points),
        })
        .collect();

    for (point, speed) in points.iter_mut().zip(derived) {
        if point.velocity.is_none() {
            point.velocity = Some(speed);
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Owner of every loaded trajectory.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    trajectories: Vec<Trajectory>,
    /// Bumped on every mutation so dependents know to re-render
    revision: u64,
    config: SegmentationConfig,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that segments with the given settings.
    pub fn with_config(config: SegmentationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Validates, derives and appends a trajectory. Returns its index.
    ///
    /// Nothing is stored when validation fails.
    pub fn add_trajectory(
        &mut self,
        points: Vec<FlightPoint>,
        name: &str,
        color: Rgb,
    ) -> Result<usize, TrajectoryError> {
        let trajectory = match Trajectory::build(points, name, color, &self.config) {
            Ok(t) => t,
            Err(e) => {
                warn!("Rejected trajectory '{}': {}", name, e);
                return Err(e);
            }
        };

        info!(
            "Loaded '{}': {} points, {} attack segment(s)",
            name,
            trajectory.len(),
            trajectory.attack_segments().len()
        );
        for seg in trajectory.attack_segments() {
            debug!(
                "  [{}..={}] {} {:.2}s dev={:.2}m ({})",
                seg.start_index,
                seg.end_index,
                seg.attack_type,
                seg.duration,
                seg.max_deviation,
                seg.parameter_list()
            );
        }

        self.trajectories.push(trajectory);
        self.revision += 1;
        Ok(self.trajectories.len() - 1)
    }

    /// Parses a JSON payload and adds its points.
    pub fn add_payload(
        &mut self,
        payload: TrajectoryPayload,
        name: &str,
        color: Rgb,
    ) -> Result<usize, TrajectoryError> {
        let points = payload.into_points(name)?;
        self.add_trajectory(points, name, color)
    }

    /// Drops every trajectory.
    pub fn clear(&mut self) {
        self.trajectories.clear();
        self.revision += 1;
    }

    /// Sets one trajectory's visibility. Points are untouched.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<(), TrajectoryError> {
        let len = self.trajectories.len();
        let trajectory = self
            .trajectories
            .get_mut(index)
            .ok_or(TrajectoryError::IndexOutOfRange { index, len })?;

        if trajectory.visible != visible {
            trajectory.visible = visible;
            self.revision += 1;
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Trajectory> {
        self.trajectories.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    /// Visible trajectories with their store indices.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Trajectory)> {
        self.trajectories.iter().enumerate().filter(|(_, t)| t.visible)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Max over visible trajectories of `len - 1`; 0 when none are visible.
    pub fn max_index(&self) -> usize {
        self.visible().map(|(_, t)| t.last_index()).max().unwrap_or(0)
    }

    /// The visible trajectory with the most points (first wins ties).
    pub fn longest_visible(&self) -> Option<&Trajectory> {
        self.visible()
            .map(|(_, t)| t)
            .fold(None, |best: Option<&Trajectory>, t| match best {
                Some(b) if b.len() >= t.len() => Some(b),
                _ => Some(t),
            })
    }
}
