//! Named replay scenarios.
//!
//! Each scenario is a fixed set of flight profiles. Combined with a seed it
//! yields a reproducible set of logs whose attack segmentation is known in
//! advance, so a headless run can check the engine end to end.

use crate::error::SimError;
use crate::generator::{AttackWindow, FlightGenerator, FlightProfile, Injection, PathShape};
use crate::runner::FlightInput;
use flightview_core::TypeChangePolicy;
use std::f64::consts::FRAC_PI_4;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// One clean figure-eight, no attacks
    Clean,

    /// Orbit with a ramping GPS position offset
    GpsSpoof,

    /// Straight leg with a speed offset and no position deltas
    VelocityDrift,

    /// Several attack types, two of them back to back
    Mixed,

    /// Three aircraft with different lengths and sample rates
    Formation,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Clean,
            ScenarioId::GpsSpoof,
            ScenarioId::VelocityDrift,
            ScenarioId::Mixed,
            ScenarioId::Formation,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Clean => "clean",
            ScenarioId::GpsSpoof => "gps_spoof",
            ScenarioId::VelocityDrift => "velocity_drift",
            ScenarioId::Mixed => "mixed",
            ScenarioId::Formation => "formation",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Clean => "Figure-eight with attack columns but no attacked samples",
            ScenarioId::GpsSpoof => "150m orbit, 40m east offset ramped in over 15s",
            ScenarioId::VelocityDrift => "Straight leg, +4 m/s speed injection for 20s",
            ScenarioId::Mixed => "GPS spoof, velocity drift, then jamming handing over to replay",
            ScenarioId::Formation => "Lead under attack, untagged wingman, short clean chase plane",
        }
    }

    /// Flight profiles, in generation order.
    pub fn flights(&self) -> Vec<FlightProfile> {
        match self {
            ScenarioId::Clean => vec![FlightProfile::new("clean_fig8")
                .with_shape(PathShape::FigureEight { radius: 100.0 })
                .with_timing(10.0, 60.0)],

            ScenarioId::GpsSpoof => vec![FlightProfile::new("spoofed_orbit")
                .with_shape(PathShape::Circle { radius: 150.0 })
                .with_timing(10.0, 60.0)
                .with_attack(AttackWindow::new(
                    "GPS_SPOOF",
                    20.0,
                    35.0,
                    Injection::PositionRamp { offset: [0.0, 40.0, -5.0] },
                ))],

            ScenarioId::VelocityDrift => vec![FlightProfile::new("drifting_leg")
                .with_shape(PathShape::Straight { heading: 0.6 })
                .with_timing(10.0, 45.0)
                .with_attack(AttackWindow::new(
                    "VELOCITY_DRIFT",
                    10.0,
                    30.0,
                    Injection::VelocityOffset { delta: 4.0 },
                ))],

            ScenarioId::Mixed => vec![FlightProfile::new("mixed_orbit")
                .with_shape(PathShape::Circle { radius: 120.0 })
                .with_timing(10.0, 60.0)
                .with_attack(AttackWindow::new(
                    "GPS_SPOOF",
                    5.0,
                    10.0,
                    Injection::PositionRamp { offset: [15.0, 0.0, 0.0] },
                ))
                .with_attack(AttackWindow::new(
                    "VELOCITY_DRIFT",
                    20.0,
                    25.0,
                    Injection::VelocityOffset { delta: -2.5 },
                ))
                // Consecutive samples: one run when relabelled, two when split
                .with_attack(AttackWindow::new("JAMMING", 35.0, 38.0, Injection::FlagOnly))
                .with_attack(AttackWindow::new(
                    "REPLAY",
                    38.1,
                    42.0,
                    Injection::PositionRamp { offset: [-8.0, 6.0, 0.0] },
                ))],

            ScenarioId::Formation => {
                let mut wingman = FlightProfile::new("wingman")
                    .with_shape(PathShape::FigureEight { radius: 80.0 })
                    .with_timing(5.0, 45.0);
                wingman.attack_columns = false;
                wingman.altitude = 60.0;

                let mut chase = FlightProfile::new("chase")
                    .with_shape(PathShape::Straight { heading: FRAC_PI_4 })
                    .with_timing(20.0, 30.0);
                chase.include_attitude = false;
                chase.altitude = 40.0;

                vec![
                    FlightProfile::new("lead")
                        .with_shape(PathShape::Circle { radius: 120.0 })
                        .with_timing(10.0, 60.0)
                        .with_attack(AttackWindow::new(
                            "GPS_SPOOF",
                            15.0,
                            25.0,
                            Injection::PositionRamp { offset: [10.0, 10.0, 0.0] },
                        )),
                    wingman,
                    chase,
                ]
            }
        }
    }

    /// Attack segments each flight must produce under `policy`.
    pub fn expected_segments(&self, policy: TypeChangePolicy) -> Vec<usize> {
        match (self, policy) {
            (ScenarioId::Clean, _) => vec![0],
            (ScenarioId::GpsSpoof, _) | (ScenarioId::VelocityDrift, _) => vec![1],
            (ScenarioId::Mixed, TypeChangePolicy::Overwrite) => vec![3],
            (ScenarioId::Mixed, TypeChangePolicy::Split) => vec![4],
            (ScenarioId::Formation, _) => vec![1, 0, 0],
        }
    }

    /// Generates the scenario's logs from `seed`.
    pub fn build(&self, seed: u64) -> Result<Vec<FlightInput>, SimError> {
        let mut generator = FlightGenerator::new(seed);
        self.flights()
            .iter()
            .map(|profile| {
                let points = generator.generate(profile)?;
                Ok(FlightInput::from_points(&profile.name, points))
            })
            .collect()
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clean" => Ok(ScenarioId::Clean),
            "gps_spoof" | "gpsspoof" | "spoof" => Ok(ScenarioId::GpsSpoof),
            "velocity_drift" | "velocitydrift" | "drift" => Ok(ScenarioId::VelocityDrift),
            "mixed" => Ok(ScenarioId::Mixed),
            "formation" => Ok(ScenarioId::Formation),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.to_string().parse::<ScenarioId>().unwrap(), id);
        }
        assert_eq!("SPOOF".parse::<ScenarioId>().unwrap(), ScenarioId::GpsSpoof);
        assert!(matches!(
            "chaos".parse::<ScenarioId>(),
            Err(SimError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_expectations_cover_every_flight() {
        for id in ScenarioId::all() {
            let flights = id.flights().len();
            assert_eq!(id.expected_segments(TypeChangePolicy::Overwrite).len(), flights);
            assert_eq!(id.expected_segments(TypeChangePolicy::Split).len(), flights);
        }
    }

    #[test]
    fn test_build_is_seeded() {
        let a = ScenarioId::Formation.build(9).unwrap();
        let b = ScenarioId::Formation.build(9).unwrap();

        assert_eq!(a.len(), 3);
        assert_eq!(a[0].name, "lead");
        assert_eq!(a[0].payload.data, b[0].payload.data);
        assert_eq!(a[2].payload.data.as_ref().map(Vec::len), Some(601));
    }
}
