//! Synthetic flight-log generator.
//!
//! Produces normalized flight logs the way the CSV normalizer would hand
//! them to the engine:
//! - Ground-truth kinematics along a parametric path (NED frame)
//! - Gaussian position noise from a seeded RNG
//! - Attack windows that inject position/velocity offsets and fill the
//!   `is_attacked` / `attack_type` / `delta_*` columns
//!
//! The same seed and profile always produce the same log.

use crate::error::SimError;
use flightview_core::point::{FieldValue, NO_ATTACK_LABEL};
use flightview_core::FlightPoint;
use nalgebra::Vector3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Standard gravity, used for the coordinated-turn bank angle.
const GRAVITY: f64 = 9.81;

/// Step used for the numerical path derivative (seconds).
const DERIVATIVE_STEP: f64 = 1e-3;

// =============================================================================
// PROFILES
// =============================================================================

/// Horizontal path the aircraft follows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PathShape {
    /// Straight leg on a fixed heading (radians, clockwise from north)
    Straight { heading: f64 },
    /// Constant-rate orbit starting at the origin
    Circle { radius: f64 },
    /// Lemniscate centred on the origin
    FigureEight { radius: f64 },
}

/// What an attack window does to the reported samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Injection {
    /// Position offset ramping linearly from zero to `offset` (meters, NED)
    PositionRamp { offset: [f64; 3] },
    /// Constant speed offset (m/s)
    VelocityOffset { delta: f64 },
    /// Flags the samples without recording any delta columns
    FlagOnly,
}

/// A time span of the log affected by one attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackWindow {
    /// Label written to `attack_type`
    pub attack_type: String,

    /// Window start (seconds, inclusive)
    pub start: f64,

    /// Window end (seconds, inclusive)
    pub end: f64,

    pub injection: Injection,
}

impl AttackWindow {
    pub fn new(attack_type: &str, start: f64, end: f64, injection: Injection) -> Self {
        Self {
            attack_type: attack_type.to_string(),
            start,
            end,
            injection,
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Ramp progress at `time` in [0, 1].
    fn progress(&self, time: f64) -> f64 {
        let span = self.end - self.start;
        if span <= 0.0 {
            1.0
        } else {
            ((time - self.start) / span).clamp(0.0, 1.0)
        }
    }
}

/// Everything needed to generate one flight log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightProfile {
    /// Display name of the generated trajectory
    pub name: String,

    /// Samples per second
    pub sample_rate: f64,

    /// Log length (seconds)
    pub duration: f64,

    /// Ground speed (m/s)
    pub speed: f64,

    /// Cruise altitude (meters above origin)
    pub altitude: f64,

    /// Amplitude of the slow altitude wave (meters)
    pub altitude_wave: f64,

    pub shape: PathShape,

    /// Position noise standard deviation (meters); zero disables noise
    pub position_noise_std: f64,

    /// Whether samples carry phi/theta/psi columns
    pub include_attitude: bool,

    /// Whether the log has attack columns at all
    pub attack_columns: bool,

    pub attacks: Vec<AttackWindow>,
}

impl FlightProfile {
    /// A clean straight-and-level profile.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sample_rate: 10.0,
            duration: 60.0,
            speed: 15.0,
            altitude: 50.0,
            altitude_wave: 3.0,
            shape: PathShape::Straight { heading: 0.0 },
            position_noise_std: 0.3,
            include_attitude: true,
            attack_columns: true,
            attacks: Vec::new(),
        }
    }

    pub fn with_shape(mut self, shape: PathShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_timing(mut self, sample_rate: f64, duration: f64) -> Self {
        self.sample_rate = sample_rate;
        self.duration = duration;
        self
    }

    pub fn with_attack(mut self, window: AttackWindow) -> Self {
        self.attacks.push(window);
        self
    }

    /// Number of samples the profile generates.
    pub fn sample_count(&self) -> usize {
        (self.duration * self.sample_rate).floor() as usize + 1
    }

    fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: &str| SimError::InvalidProfile {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(invalid("sample rate must be positive"));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(invalid("duration must be non-negative"));
        }
        if !self.position_noise_std.is_finite() || self.position_noise_std < 0.0 {
            return Err(invalid("noise must be a finite non-negative value"));
        }
        if let Some(w) = self.attacks.iter().find(|w| !(w.start <= w.end)) {
            return Err(invalid(&format!("attack window '{}' ends before it starts", w.attack_type)));
        }
        Ok(())
    }

    /// Ground-truth NED position at `t`.
    fn truth_position(&self, t: f64) -> Vector3<f64> {
        let distance = self.speed * t;
        let (n, e) = match self.shape {
            PathShape::Straight { heading } => (distance * heading.cos(), distance * heading.sin()),
            PathShape::Circle { radius } => {
                let angle = distance / radius.max(f64::EPSILON);
                (radius * angle.sin(), radius * (1.0 - angle.cos()))
            }
            PathShape::FigureEight { radius } => {
                let angle = distance / radius.max(f64::EPSILON);
                (radius * angle.sin(), radius * angle.sin() * angle.cos())
            }
        };
        let altitude = self.altitude + self.altitude_wave * (2.0 * PI * t / 30.0).sin();
        Vector3::new(n, e, -altitude)
    }

    /// Roll, pitch and yaw implied by the path at `t`.
    fn truth_attitude(&self, t: f64) -> (f64, f64, f64) {
        let ahead = self.truth_position(t + DERIVATIVE_STEP);
        let here = self.truth_position(t);
        let delta = ahead - here;

        let horizontal = (delta.x * delta.x + delta.y * delta.y).sqrt();
        let yaw = delta.y.atan2(delta.x);
        let pitch = (-delta.z).atan2(horizontal);
        let roll = match self.shape {
            PathShape::Straight { .. } => 0.0,
            PathShape::Circle { radius } | PathShape::FigureEight { radius } => {
                (self.speed * self.speed / (GRAVITY * radius.max(f64::EPSILON))).atan()
            }
        };
        (roll, pitch, yaw)
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Seeded generator of synthetic flight logs.
pub struct FlightGenerator {
    seed: u64,
    rng: ChaCha8Rng,
}

impl FlightGenerator {
    /// Creates a generator. Every profile generated afterwards draws from
    /// the same stream, so generation order matters.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates one flight log.
    pub fn generate(&mut self, profile: &FlightProfile) -> Result<Vec<FlightPoint>, SimError> {
        profile.validate()?;

        let noise = if profile.position_noise_std > 0.0 {
            Normal::new(0.0, profile.position_noise_std).ok()
        } else {
            None
        };

        let points = (0..profile.sample_count())
            .map(|i| {
                let t = i as f64 / profile.sample_rate;
                self.sample(profile, t, noise.as_ref())
            })
            .collect();

        Ok(points)
    }

    fn sample(&mut self, profile: &FlightProfile, t: f64, noise: Option<&Normal<f64>>) -> FlightPoint {
        let mut position = profile.truth_position(t);
        if let Some(dist) = noise {
            position += Vector3::new(
                dist.sample(&mut self.rng),
                dist.sample(&mut self.rng),
                dist.sample(&mut self.rng),
            );
        }

        let mut point = FlightPoint::new(t, position.x, position.y, position.z);
        if profile.include_attitude {
            let (roll, pitch, yaw) = profile.truth_attitude(t);
            point = point.with_attitude(roll, pitch, yaw);
        }

        match profile.attacks.iter().find(|w| w.contains(t)) {
            Some(window) => inject(point, window, t),
            None if profile.attack_columns => {
                point.attack.is_attacked = Some(FieldValue::Bool(false));
                point.attack.attack_type = Some(FieldValue::from(NO_ATTACK_LABEL));
                point
            }
            None => point,
        }
    }
}

fn inject(mut point: FlightPoint, window: &AttackWindow, t: f64) -> FlightPoint {
    point.attack.is_attacked = Some(FieldValue::Bool(true));
    point.attack.attack_type = Some(FieldValue::from(window.attack_type.as_str()));

    match window.injection {
        Injection::PositionRamp { offset } => {
            let k = window.progress(t);
            let [n, e, d] = offset.map(|o| o * k);
            point.position_n += n;
            point.position_e += e;
            point.position_d += d;
            point.with_position_deltas(n, e, d)
        }
        Injection::VelocityOffset { delta } => point.with_velocity_delta(delta),
        Injection::FlagOnly => point,
    }
}
