//! Chart/overlay adapter
//!
//! Projects visible trajectories and their attack segments onto time-series
//! traces for the 2D charts. Values come from the raw points, so altitude is
//! never exaggerated here.

use crate::playback::AnimationClock;
use crate::point::FlightPoint;
use crate::segmentation::{AttackSegment, DeviationSource};
use crate::trajectory::{Rgb, TrajectoryStore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A plottable per-point quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartChannel {
    Altitude,
    PositionN,
    PositionE,
    PositionD,
    Velocity,
    Roll,
    Pitch,
    Yaw,
}

impl ChartChannel {
    pub fn all() -> [ChartChannel; 8] {
        [
            ChartChannel::Altitude,
            ChartChannel::PositionN,
            ChartChannel::PositionE,
            ChartChannel::PositionD,
            ChartChannel::Velocity,
            ChartChannel::Roll,
            ChartChannel::Pitch,
            ChartChannel::Yaw,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChartChannel::Altitude => "altitude",
            ChartChannel::PositionN => "position_n",
            ChartChannel::PositionE => "position_e",
            ChartChannel::PositionD => "position_d",
            ChartChannel::Velocity => "velocity",
            ChartChannel::Roll => "phi",
            ChartChannel::Pitch => "theta",
            ChartChannel::Yaw => "psi",
        }
    }

    /// Channel value of a point; `None` when the point lacks it.
    pub fn sample(&self, point: &FlightPoint) -> Option<f64> {
        match self {
            ChartChannel::Altitude => Some(point.altitude()),
            ChartChannel::PositionN => Some(point.position_n),
            ChartChannel::PositionE => Some(point.position_e),
            ChartChannel::PositionD => Some(point.position_d),
            ChartChannel::Velocity => point.velocity,
            ChartChannel::Roll => point.phi,
            ChartChannel::Pitch => point.theta,
            ChartChannel::Yaw => point.psi,
        }
    }
}

impl fmt::Display for ChartChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line on a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTrace {
    pub name: String,
    pub color: Rgb,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Highlighted sub-trace over one attack segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOverlay {
    pub trajectory: String,
    pub label: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Shaded time span behind a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackBand {
    pub trajectory: String,
    pub attack_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub max_deviation: f64,
    /// False when the deviation is the no-delta placeholder
    pub measured: bool,
}

fn collect_samples(points: &[FlightPoint], channel: ChartChannel) -> (Vec<f64>, Vec<f64>) {
    points
        .iter()
        .filter_map(|p| channel.sample(p).map(|v| (p.time, v)))
        .unzip()
}

/// Overlay label, e.g. `GPS_SPOOF (max 12.5m)`, with `~` for heuristic
/// deviations.
pub fn segment_label(segment: &AttackSegment) -> String {
    let approx = match segment.deviation_source {
        DeviationSource::Measured => "",
        DeviationSource::Heuristic => "~",
    };
    format!(
        "{} (max {}{:.1}m)",
        segment.attack_type, approx, segment.max_deviation
    )
}

/// One trace per visible trajectory.
pub fn build_traces(store: &TrajectoryStore, channel: ChartChannel) -> Vec<ChartTrace> {
    store
        .visible()
        .map(|(_, t)| {
            let (times, values) = collect_samples(t.points(), channel);
            ChartTrace {
                name: t.name.clone(),
                color: t.color,
                times,
                values,
            }
        })
        .collect()
}

/// One overlay per drawable segment (two or more points) of each visible
/// trajectory.
pub fn attack_overlays(store: &TrajectoryStore, channel: ChartChannel) -> Vec<AttackOverlay> {
    store
        .visible()
        .flat_map(|(_, t)| {
            t.attack_segments()
                .iter()
                .filter(|s| s.point_count() >= 2)
                .map(move |s| {
                    let range = &t.points()[s.start_index..=s.end_index];
                    let (times, values) = collect_samples(range, channel);
                    AttackOverlay {
                        trajectory: t.name.clone(),
                        label: segment_label(s),
                        times,
                        values,
                    }
                })
        })
        .collect()
}

/// Time spans of every segment of every visible trajectory.
pub fn attack_bands(store: &TrajectoryStore) -> Vec<AttackBand> {
    store
        .visible()
        .flat_map(|(_, t)| {
            t.attack_segments().iter().map(move |s| AttackBand {
                trajectory: t.name.clone(),
                attack_type: s.attack_type.clone(),
                start_time: s.start_time,
                end_time: s.end_time,
                max_deviation: s.max_deviation,
                measured: s.deviation_source == DeviationSource::Measured,
            })
        })
        .collect()
}

/// Chart cursor: log time at the shared index on the longest visible
/// trajectory.
pub fn cursor_time(store: &TrajectoryStore, clock: &AnimationClock) -> Option<f64> {
    let longest = store.longest_visible()?;
    let index = clock.frame_index(longest.len())?;
    longest.points().get(index).map(|p| p.time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn store() -> TrajectoryStore {
        let mut store = TrajectoryStore::new();
        store
            .add_trajectory(
                vec![
                    FlightPoint::new(0.0, 0.0, 0.0, -10.0),
                    FlightPoint::new(1.0, 1.0, 0.0, -12.0).with_attack_type("PA"),
                    FlightPoint::new(2.0, 2.0, 0.0, -11.0).with_attack_type("PA"),
                    FlightPoint::new(3.0, 3.0, 0.0, -9.0),
                    FlightPoint::new(4.0, 4.0, 0.0, -9.0).attacked(),
                ],
                "attacked",
                Rgb::palette(0),
            )
            .unwrap();
        store
            .add_trajectory(
                vec![
                    FlightPoint::new(0.0, 0.0, 0.0, -5.0).with_attitude(0.1, 0.2, 0.3),
                    FlightPoint::new(0.5, 0.0, 1.0, -5.0),
                ],
                "clean",
                Rgb::palette(1),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_altitude_trace_is_unscaled() {
        let store = store();
        let traces = build_traces(&store, ChartChannel::Altitude);

        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].name, "attacked");
        assert_eq!(traces[0].values, vec![10.0, 12.0, 11.0, 9.0, 9.0]);
        assert_eq!(traces[0].times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_missing_samples_skipped() {
        let store = store();
        let traces = build_traces(&store, ChartChannel::Roll);

        assert!(traces[0].values.is_empty());
        assert_eq!(traces[1].values, vec![0.1]);
        assert_eq!(traces[1].times, vec![0.0]);
    }

    #[test]
    fn test_overlays_skip_single_point_segments() {
        let store = store();
        let overlays = attack_overlays(&store, ChartChannel::Altitude);

        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].times, vec![1.0, 2.0]);
        assert_eq!(overlays[0].values, vec![12.0, 11.0]);
        assert!(overlays[0].label.starts_with("PA"));

        // Bands keep the single-point segment
        let bands = attack_bands(&store);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1].start_time, bands[1].end_time);
        assert!(!bands[1].measured);
    }

    #[test]
    fn test_hidden_trajectories_not_charted() {
        let mut store = store();
        store.set_visible(0, false).unwrap();

        assert_eq!(build_traces(&store, ChartChannel::Velocity).len(), 1);
        assert!(attack_overlays(&store, ChartChannel::Altitude).is_empty());
        assert!(attack_bands(&store).is_empty());
    }

    #[test]
    fn test_cursor_time() {
        let store = store();
        let mut clock = AnimationClock::new();
        clock.set_max_index(store.max_index());
        clock.seek(2.4);

        assert_relative_eq!(cursor_time(&store, &clock).unwrap(), 2.0);
        assert!(cursor_time(&TrajectoryStore::new(), &clock).is_none());
    }

    #[test]
    fn test_label_marks_heuristic() {
        let store = store();
        let seg = &store.get(0).unwrap().attack_segments()[0];
        // 1s without deltas -> 0.5m placeholder
        assert_eq!(segment_label(seg), "PA (max ~0.5m)");
    }
}
