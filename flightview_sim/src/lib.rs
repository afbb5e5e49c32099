//! FlightView Headless Playback Harness
//!
//! Runs the playback engine without a rendering surface, so whole
//! load → segment → play cycles can be checked and recorded.
//!
//! # Pieces
//!
//! - **Generator**: seeded synthetic flight logs with injected attacks
//! - **Scenarios**: named profile sets with known segmentation
//! - **Runner**: drives a `FlightViewer` for N frames and reports
//! - **Exporter**: per-frame poses, camera and active attacks as JSON
//! - **Visualizer**: optional Rerun stream (`visualization` feature)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ JSON payload │   │ FlightGen    │
//! │ (--input)    │   │ (seed)       │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!            ┌────▼─────┐      ┌──────────────┐
//!            │  Runner  ├─────►│ FlightViewer │  tick() × N
//!            └────┬─────┘      └──────────────┘
//!        ┌────────┴─────────┐
//!   ┌────▼─────┐      ┌─────▼──────┐
//!   │ Exporter │      │ Rerun      │
//!   └──────────┘      └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flightview_sim::{PlaybackRunner, RunConfig, ScenarioId};
//!
//! let runner = PlaybackRunner::new(RunConfig::default());
//! let result = runner.run_scenario(ScenarioId::GpsSpoof, 42)?;
//! assert!(result.passed);
//! ```

pub mod error;
pub mod exporter;
pub mod generator;
pub mod runner;
pub mod scenarios;
pub mod visualizer;

pub use error::SimError;
pub use exporter::{PlaybackExport, PlaybackFrame};
pub use generator::{AttackWindow, FlightGenerator, FlightProfile, Injection, PathShape};
pub use runner::{FlightInput, PlaybackRunner, RunConfig, RunReport, ScenarioResult};
pub use scenarios::ScenarioId;
pub use visualizer::RerunLogger;
