//! FlightView Core - Trajectory Playback & Attack-Segmentation Engine
//!
//! This library turns normalized UAV flight logs into a playable 3D scene:
//! 1. **Transform**: North-East-Down samples to a Y-up render space with
//!    exaggerated altitude
//! 2. **Store**: one owned trajectory per log, with derived speeds and metadata
//! 3. **Segmentation**: contiguous data-integrity attack runs with type,
//!    affected parameters and peak deviation
//! 4. **Playback**: a shared looping time index, aircraft poses and camera modes
//!
//! Everything runs synchronously on the caller's frame loop; see
//! [`viewer::FlightViewer`].

pub mod camera;
pub mod chart;
pub mod error;
pub mod playback;
pub mod point;
pub mod pose;
pub mod segmentation;
pub mod trajectory;
pub mod transform;
pub mod viewer;

// Re-export key types for convenience
pub use camera::{CameraConfig, CameraPose, ViewMode};
pub use error::TrajectoryError;
pub use playback::{AnimationClock, AnimationState, PlaybackState};
pub use point::{AttackFields, FieldValue, FlightPoint};
pub use pose::AircraftPose;
pub use segmentation::{AttackSegment, AttackedParameter, SegmentationConfig, TypeChangePolicy};
pub use trajectory::{Rgb, Trajectory, TrajectoryPayload, TrajectoryStore};
pub use transform::ALTITUDE_SCALE;
pub use viewer::{FlightViewer, FrameUpdate, ViewerConfig};
