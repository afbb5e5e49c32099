//! Error types for the FlightView engine.

use thiserror::Error;

/// Errors raised when a trajectory is loaded or addressed.
///
/// Everything else in the engine (missing optional fields, out-of-range time
/// indices, degenerate time deltas) is resolved locally and never surfaces
/// as an error.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    /// Payload carried no `data` array at all
    #[error("Payload has no data array")]
    MissingData,

    /// Payload or point list was empty
    #[error("Trajectory '{0}' has no points")]
    Empty(String),

    /// A required numeric field was NaN or infinite
    #[error("Point {index} has a non-finite {field}")]
    NonFinite { index: usize, field: &'static str },

    /// Payload could not be deserialized
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Trajectory index does not exist in the store
    #[error("Trajectory index {index} out of range (store holds {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl TrajectoryError {
    /// Creates an empty-trajectory error.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::Empty(name.into())
    }
}

/// A display color could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid color '{0}', expected #rrggbb")]
pub struct ColorParseError(pub String);

/// A view-mode name was not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown view mode '{0}' (expected top-down, side, trailing or free)")]
pub struct ViewModeParseError(pub String);
