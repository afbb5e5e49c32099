//! Normalized flight-log points
//!
//! A [`FlightPoint`] is one record handed over by the normalizer: position in
//! the North-East-Down frame, a monotonic time in seconds, optional attitude
//! and speed, and an optional block of attack annotations.
//!
//! The attack annotations arrive loosely typed (booleans, numbers and strings
//! all show up for the same column depending on the source log), so each one
//! is kept as its own `Option` in [`AttackFields`] and interpreted through
//! small predicate methods rather than by key lookup.

use serde::{Deserialize, Serialize};

/// Literal the normalizer writes into `attack_type` for clean samples.
pub const NO_ATTACK_LABEL: &str = "None";

// =============================================================================
// LOOSE FIELD VALUES
// =============================================================================

/// A loosely typed scalar as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Truthiness used for `is_attacked` / `attack_status`.
    ///
    /// `0`, `false`, `"0"`, `"false"`, `"no"` and blank strings are false;
    /// any other value is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return false;
                }
                if let Ok(n) = s.parse::<f64>() {
                    return n != 0.0 && !n.is_nan();
                }
                !matches!(
                    s.to_ascii_lowercase().as_str(),
                    "false" | "no" | "none" | "null" | "nan"
                )
            }
        }
    }

    /// Label form used for `attack_type`. `None` for blanks, booleans and
    /// the literal "None".
    pub fn label(&self) -> Option<String> {
        match self {
            FieldValue::Bool(_) => None,
            FieldValue::Number(n) if n.is_nan() => None,
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() || s == NO_ATTACK_LABEL {
                    None
                } else {
                    Some(s.to_string())
                }
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

// =============================================================================
// ATTACK FIELDS
// =============================================================================

/// Optional attack annotations carried by a point.
///
/// Absence of any field always means "not attacked" / "no deviation
/// contribution"; nothing here is ever an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attacked: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_status: Option<FieldValue>,

    /// Injected north offset (meters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_position_n: Option<f64>,

    /// Injected east offset (meters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_position_e: Option<f64>,

    /// Injected down offset (meters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_position_d: Option<f64>,

    /// Injected speed offset (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_velocity: Option<f64>,
}

impl AttackFields {
    /// True if any of `is_attacked`, `attack_type` or `attack_status` marks
    /// this sample as attacked.
    pub fn is_attacked(&self) -> bool {
        self.is_attacked.as_ref().is_some_and(FieldValue::is_truthy)
            || self.attack_label().is_some()
            || self.attack_status.as_ref().is_some_and(FieldValue::is_truthy)
    }

    /// The reported attack type, ignoring blanks and the "None" literal.
    pub fn attack_label(&self) -> Option<String> {
        self.attack_type.as_ref().and_then(FieldValue::label)
    }

    /// Whether any delta field is present (zero or not).
    pub fn has_delta(&self) -> bool {
        self.deltas().any(|d| d.is_some())
    }

    /// Position deltas followed by the velocity delta.
    pub fn deltas(&self) -> impl Iterator<Item = Option<f64>> {
        [
            self.delta_position_n,
            self.delta_position_e,
            self.delta_position_d,
            self.delta_velocity,
        ]
        .into_iter()
    }
}

// =============================================================================
// FLIGHT POINT
// =============================================================================

/// One normalized flight-log sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPoint {
    /// North position (meters)
    #[serde(default)]
    pub position_n: f64,

    /// East position (meters)
    #[serde(default)]
    pub position_e: f64,

    /// Down position (meters, negative = up)
    #[serde(default)]
    pub position_d: f64,

    /// Roll (radians)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phi: Option<f64>,

    /// Pitch (radians)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,

    /// Yaw / heading (radians, clockwise from north)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psi: Option<f64>,

    /// Speed (render units per second when derived)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,

    /// Seconds since the start of the log
    #[serde(default)]
    pub time: f64,

    #[serde(flatten)]
    pub attack: AttackFields,
}

impl FlightPoint {
    /// Creates an un-annotated point.
    pub fn new(time: f64, position_n: f64, position_e: f64, position_d: f64) -> Self {
        Self {
            position_n,
            position_e,
            position_d,
            time,
            ..Default::default()
        }
    }

    /// Sets roll, pitch and yaw.
    pub fn with_attitude(mut self, phi: f64, theta: f64, psi: f64) -> Self {
        self.phi = Some(phi);
        self.theta = Some(theta);
        self.psi = Some(psi);
        self
    }

    /// Sets an explicit speed.
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Marks the point attacked without a type.
    pub fn attacked(mut self) -> Self {
        self.attack.is_attacked = Some(FieldValue::Bool(true));
        self
    }

    /// Sets `attack_type` (which by itself marks the point attacked unless
    /// it is "None").
    pub fn with_attack_type(mut self, attack_type: &str) -> Self {
        self.attack.attack_type = Some(FieldValue::from(attack_type));
        self
    }

    /// Sets the injected position deltas.
    pub fn with_position_deltas(mut self, n: f64, e: f64, d: f64) -> Self {
        self.attack.delta_position_n = Some(n);
        self.attack.delta_position_e = Some(e);
        self.attack.delta_position_d = Some(d);
        self
    }

    /// Sets the injected speed delta.
    pub fn with_velocity_delta(mut self, delta: f64) -> Self {
        self.attack.delta_velocity = Some(delta);
        self
    }

    /// Raw altitude (meters, unscaled).
    pub fn altitude(&self) -> f64 {
        -self.position_d
    }

    /// Roll, pitch and yaw if all three are present.
    pub fn attitude(&self) -> Option<(f64, f64, f64)> {
        match (self.phi, self.theta, self.psi) {
            (Some(phi), Some(theta), Some(psi)) => Some((phi, theta, psi)),
            _ => None,
        }
    }

    /// Shorthand for `self.attack.is_attacked()`.
    pub fn is_attacked(&self) -> bool {
        self.attack.is_attacked()
    }

    /// First non-finite required field, if any.
    pub(crate) fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("position_n", self.position_n),
            ("position_e", self.position_e),
            ("position_d", self.position_d),
            ("time", self.time),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}
