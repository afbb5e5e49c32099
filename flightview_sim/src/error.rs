//! Error types for the FlightView harness.

use flightview_core::TrajectoryError;
use thiserror::Error;

/// Errors raised while preparing or running a playback.
#[derive(Debug, Error)]
pub enum SimError {
    /// Reading an input or writing an export failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An input file was not valid JSON
    #[error("Invalid payload in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The engine rejected a trajectory
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// Scenario name not recognised
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// A flight profile cannot be generated
    #[error("Invalid flight profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },
}

impl SimError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
