//! Camera view modes
//!
//! A view mode is a pure mapping from a name (and, for trailing, the active
//! trajectory's current point) to a camera position and target. `Free` and a
//! trailing request with nothing visible leave the previous camera alone.

use crate::error::ViewModeParseError;
use crate::trajectory::Trajectory;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named camera placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Straight down onto the origin
    TopDown,
    /// Altitude-vs-horizontal profile
    Side,
    /// Behind and above the active aircraft
    Trailing,
    /// User-controlled; never overridden
    #[default]
    Free,
}

impl ViewMode {
    pub fn all() -> [ViewMode; 4] {
        [ViewMode::TopDown, ViewMode::Side, ViewMode::Trailing, ViewMode::Free]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewMode::TopDown => "top-down",
            ViewMode::Side => "side",
            ViewMode::Trailing => "trailing",
            ViewMode::Free => "free",
        }
    }
}

impl FromStr for ViewMode {
    type Err = ViewModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" | "topdown" | "top-down" | "top_down" => Ok(ViewMode::TopDown),
            "side" => Ok(ViewMode::Side),
            "trailing" | "follow" => Ok(ViewMode::Trailing),
            "free" => Ok(ViewMode::Free),
            _ => Err(ViewModeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Camera placement in render space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vector3::new(100.0, 100.0, 100.0),
            target: Vector3::zeros(),
        }
    }
}

/// Distances used by the fixed view modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Height of the top-down camera above the origin
    pub top_down_height: f64,

    /// Distance of the side camera along render +X
    pub side_distance: f64,

    /// Offset from the aircraft to the trailing camera
    pub trailing_offset: Vector3<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            top_down_height: 300.0,
            side_distance: 300.0,
            trailing_offset: Vector3::new(0.0, 15.0, -30.0),
        }
    }
}

/// Camera for `mode`.
///
/// `active` is the trajectory the trailing camera follows and `time_index`
/// the point on it; both are ignored by the other modes.
pub fn camera_for(
    mode: ViewMode,
    active: Option<&Trajectory>,
    time_index: usize,
    previous: CameraPose,
    config: &CameraConfig,
) -> CameraPose {
    match mode {
        ViewMode::TopDown => CameraPose {
            position: Vector3::new(0.0, config.top_down_height, 0.0),
            target: Vector3::zeros(),
        },
        ViewMode::Side => CameraPose {
            position: Vector3::new(config.side_distance, 0.0, 0.0),
            target: Vector3::zeros(),
        },
        ViewMode::Trailing => active
            .filter(|t| t.visible)
            .and_then(|t| t.render_points().get(time_index))
            .map(|aircraft| CameraPose {
                position: aircraft + config.trailing_offset,
                target: *aircraft,
            })
            .unwrap_or(previous),
        ViewMode::Free => previous,
    }
}
