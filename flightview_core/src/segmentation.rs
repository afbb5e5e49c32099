//! The attack segmentation engine
//!
//! Scans a trajectory's ordered points once, left to right, and groups every
//! maximal run of attacked points into an [`AttackSegment`]:
//!
//! 1. **Detection**: a point is attacked if `is_attacked` is truthy, a
//!    non-"None" `attack_type` is present, or `attack_status` is truthy.
//! 2. **Accumulation**: an open segment absorbs consecutive attacked points,
//!    tracking the latest reported type and the union of affected parameters.
//! 3. **Closing**: the first clean point (or the end of the array) closes the
//!    segment and fixes its time bounds and peak deviation.
//!
//! Single-point and zero-duration segments are kept; consumers decide what
//! to draw.

use crate::point::{AttackFields, FlightPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Meters of assumed displacement per second of attack when a segment
/// carries no delta fields at all.
pub const FALLBACK_DEVIATION_RATE: f64 = 0.5;

/// Type given to segments opened by a point that is attacked but untyped.
pub const DEFAULT_ATTACK_TYPE: &str = "Unknown";

// =============================================================================
// AFFECTED PARAMETERS
// =============================================================================

/// A flight parameter an attack was observed to tamper with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackedParameter {
    PositionN,
    PositionE,
    PositionD,
    Velocity,
    /// Generic position tampering, used when no delta field says which axis
    Position,
}

impl AttackedParameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackedParameter::PositionN => "position_n",
            AttackedParameter::PositionE => "position_e",
            AttackedParameter::PositionD => "position_d",
            AttackedParameter::Velocity => "velocity",
            AttackedParameter::Position => "position",
        }
    }
}

impl fmt::Display for AttackedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Detector = fn(&AttackFields) -> bool;

fn non_zero(value: Option<f64>) -> bool {
    value.is_some_and(|v| v != 0.0 && !v.is_nan())
}

fn reports_position_n(fields: &AttackFields) -> bool {
    non_zero(fields.delta_position_n)
}

fn reports_position_e(fields: &AttackFields) -> bool {
    non_zero(fields.delta_position_e)
}

fn reports_position_d(fields: &AttackFields) -> bool {
    non_zero(fields.delta_position_d)
}

fn reports_velocity(fields: &AttackFields) -> bool {
    non_zero(fields.delta_velocity)
}

/// One row per detectable parameter.
const PARAMETER_DETECTORS: &[(AttackedParameter, Detector)] = &[
    (AttackedParameter::PositionN, reports_position_n),
    (AttackedParameter::PositionE, reports_position_e),
    (AttackedParameter::PositionD, reports_position_d),
    (AttackedParameter::Velocity, reports_velocity),
];

/// Parameters an attacked point reports as tampered.
///
/// Falls back to [`AttackedParameter::Position`] when the point carries no
/// delta field at all. A point whose deltas are all present but zero
/// reports nothing.
pub fn affected_parameters(fields: &AttackFields) -> Vec<AttackedParameter> {
    let detected: Vec<AttackedParameter> = PARAMETER_DETECTORS
        .iter()
        .filter(|(_, detect)| detect(fields))
        .map(|(param, _)| *param)
        .collect();

    if detected.is_empty() && !fields.has_delta() {
        vec![AttackedParameter::Position]
    } else {
        detected
    }
}

// =============================================================================
// DEVIATION
// =============================================================================

/// Where a segment's `max_deviation` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationSource {
    /// Derived from delta fields in the log
    Measured,
    /// Rough placeholder from [`fallback_deviation`]; low confidence
    Heuristic,
}

/// Placeholder estimate for segments without delta data.
pub fn fallback_deviation(duration: f64) -> f64 {
    duration * FALLBACK_DEVIATION_RATE
}

/// Peak deviation over a segment's points.
///
/// Position deltas count at face value; a speed delta counts as the
/// constant-acceleration displacement `|dv| * duration / 2`.
pub fn estimate_deviation(points: &[FlightPoint], duration: f64) -> (f64, DeviationSource) {
    let mut max_deviation: f64 = 0.0;
    let mut measured = false;

    for point in points {
        let fields = &point.attack;
        for delta in [
            fields.delta_position_n,
            fields.delta_position_e,
            fields.delta_position_d,
        ]
        .into_iter()
        .flatten()
        {
            measured = true;
            max_deviation = max_deviation.max(delta.abs());
        }

        if let Some(dv) = fields.delta_velocity {
            measured = true;
            max_deviation = max_deviation.max(dv.abs() * duration / 2.0);
        }
    }

    if measured {
        (max_deviation, DeviationSource::Measured)
    } else {
        (fallback_deviation(duration), DeviationSource::Heuristic)
    }
}

// =============================================================================
// SEGMENTS
// =============================================================================

/// A maximal contiguous run of attacked points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSegment {
    /// First point index (inclusive)
    pub start_index: usize,

    /// Last point index (inclusive)
    pub end_index: usize,

    pub start_time: f64,
    pub end_time: f64,

    /// `end_time - start_time`, never negative
    pub duration: f64,

    /// Latest attack type reported inside the segment
    pub attack_type: String,

    pub affected_parameters: BTreeSet<AttackedParameter>,

    /// Peak estimated displacement (meters)
    pub max_deviation: f64,

    pub deviation_source: DeviationSource,
}

impl AttackSegment {
    /// Number of points covered.
    pub fn point_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }

    /// Comma-separated affected parameter names.
    pub fn parameter_list(&self) -> String {
        self.affected_parameters
            .iter()
            .map(AttackedParameter::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What to do when a running segment reports a new attack type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChangePolicy {
    /// Keep one segment and relabel it with the latest type
    #[default]
    Overwrite,
    /// Close the running segment and open a new one at the changing point
    Split,
}

/// Segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub type_change: TypeChangePolicy,

    /// Label for segments opened by untyped attacked points
    pub default_type: String,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            type_change: TypeChangePolicy::Overwrite,
            default_type: DEFAULT_ATTACK_TYPE.to_string(),
        }
    }
}

/// Result of one segmentation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    /// Ordered by `start_index`, non-overlapping
    pub segments: Vec<AttackSegment>,

    /// Index-aligned with the input points: owning segment, if any
    pub segment_of: Vec<Option<usize>>,
}

impl Segmentation {
    /// Segment covering `index`. `None` when clean or out of range.
    pub fn segment_at(&self, index: usize) -> Option<&AttackSegment> {
        self.segment_of
            .get(index)
            .copied()
            .flatten()
            .and_then(|s| self.segments.get(s))
    }
}

/// Accumulator for the segment currently being built.
struct OpenSegment {
    start_index: usize,
    end_index: usize,
    attack_type: String,
    /// Whether `attack_type` came from a point rather than the default
    typed: bool,
    parameters: BTreeSet<AttackedParameter>,
}

impl OpenSegment {
    fn start(index: usize, config: &SegmentationConfig) -> Self {
        Self {
            start_index: index,
            end_index: index,
            attack_type: config.default_type.clone(),
            typed: false,
            parameters: BTreeSet::new(),
        }
    }

    fn absorb(&mut self, index: usize, point: &FlightPoint, label: Option<String>) {
        self.end_index = index;
        if let Some(label) = label {
            // Last writer wins
            if label != self.attack_type {
                self.attack_type = label;
            }
            self.typed = true;
        }
        self.parameters.extend(affected_parameters(&point.attack));
    }

    fn changes_type(&self, label: Option<&String>) -> bool {
        self.typed && label.is_some_and(|l| *l != self.attack_type)
    }

    fn close(self, points: &[FlightPoint]) -> AttackSegment {
        let start_time = points[self.start_index].time;
        let end_time = points[self.end_index].time;
        let duration = (end_time - start_time).max(0.0);
        let (max_deviation, deviation_source) =
            estimate_deviation(&points[self.start_index..=self.end_index], duration);

        AttackSegment {
            start_index: self.start_index,
            end_index: self.end_index,
            start_time,
            end_time,
            duration,
            attack_type: self.attack_type,
            affected_parameters: self.parameters,
            max_deviation,
            deviation_source,
        }
    }
}

/// True if any point is attacked.
pub fn has_attack_data(points: &[FlightPoint]) -> bool {
    points.iter().any(FlightPoint::is_attacked)
}

/// Runs the single-pass segmentation over time-ordered points.
pub fn segment_attacks(points: &[FlightPoint], config: &SegmentationConfig) -> Segmentation {
    let mut segments = Vec::new();
    let mut segment_of = vec![None; points.len()];
    let mut open: Option<OpenSegment> = None;

    for (index, point) in points.iter().enumerate() {
        if !point.is_attacked() {
            if let Some(segment) = open.take() {
                segments.push(segment.close(points));
            }
            continue;
        }

        let label = point.attack.attack_label();
        let split = config.type_change == TypeChangePolicy::Split
            && open.as_ref().is_some_and(|s| s.changes_type(label.as_ref()));
        if split {
            if let Some(segment) = open.take() {
                segments.push(segment.close(points));
            }
        }

        open.get_or_insert_with(|| OpenSegment::start(index, config))
            .absorb(index, point, label);
        segment_of[index] = Some(segments.len());
    }

    if let Some(segment) = open.take() {
        segments.push(segment.close(points));
    }

    Segmentation {
        segments,
        segment_of,
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Per-trajectory roll-up of its attack segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackSummary {
    pub segment_count: usize,
    pub attacked_points: usize,
    /// Sum of segment durations (seconds)
    pub attacked_duration: f64,
    pub max_deviation: f64,
    /// Distinct attack types, sorted
    pub attack_types: Vec<String>,
}

impl AttackSummary {
    pub fn from_segments(segments: &[AttackSegment]) -> Self {
        let types: BTreeSet<&str> = segments.iter().map(|s| s.attack_type.as_str()).collect();

        Self {
            segment_count: segments.len(),
            attacked_points: segments.iter().map(AttackSegment::point_count).sum(),
            attacked_duration: segments.iter().map(|s| s.duration).sum(),
            max_deviation: segments.iter().map(|s| s.max_deviation).fold(0.0, f64::max),
            attack_types: types.into_iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn clean(t: f64, d: f64) -> FlightPoint {
        FlightPoint::new(t, 0.0, 0.0, d)
    }

    fn typed(t: f64, d: f64, kind: &str) -> FlightPoint {
        clean(t, d).attacked().with_attack_type(kind)
    }

    #[test]
    fn test_single_run_in_the_middle() {
        let points = vec![
            clean(0.0, -10.0),
            typed(1.0, -12.0, "PA"),
            typed(2.0, -11.0, "PA"),
            clean(3.0, -9.0),
        ];

        let result = segment_attacks(&points, &SegmentationConfig::default());

        assert_eq!(result.segments.len(), 1);
        let seg = &result.segments[0];
        assert_eq!(seg.start_index, 1);
        assert_eq!(seg.end_index, 2);
        assert_eq!(seg.attack_type, "PA");
        assert_relative_eq!(seg.duration, 1.0);
        assert_eq!(result.segment_of, vec![None, Some(0), Some(0), None]);
    }

    #[test]
    fn test_segment_open_at_end_is_closed() {
        let points = vec![clean(0.0, 0.0), typed(0.5, 0.0, "GPS"), typed(1.5, 0.0, "GPS")];
        let result = segment_attacks(&points, &SegmentationConfig::default());

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].end_index, 2);
        assert_relative_eq!(result.segments[0].end_time, 1.5);
    }

    #[test]
    fn test_single_point_trajectory() {
        let config = SegmentationConfig::default();

        let quiet = segment_attacks(&[clean(0.0, -5.0)], &config);
        assert!(quiet.segments.is_empty());

        let hit = segment_attacks(&[clean(0.0, -5.0).attacked()], &config);
        assert_eq!(hit.segments.len(), 1);
        assert_eq!(hit.segments[0].start_index, 0);
        assert_eq!(hit.segments[0].end_index, 0);
        assert_eq!(hit.segments[0].duration, 0.0);
        assert_eq!(hit.segments[0].attack_type, DEFAULT_ATTACK_TYPE);
    }

    #[test]
    fn test_type_change_overwrites_by_default() {
        let points = vec![typed(0.0, 0.0, "GPS"), typed(1.0, 0.0, "IMU"), typed(2.0, 0.0, "IMU")];
        let result = segment_attacks(&points, &SegmentationConfig::default());

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].attack_type, "IMU");
    }

    #[test]
    fn test_type_change_splits_when_configured() {
        let config = SegmentationConfig {
            type_change: TypeChangePolicy::Split,
            ..Default::default()
        };
        let points = vec![typed(0.0, 0.0, "GPS"), typed(1.0, 0.0, "IMU"), typed(2.0, 0.0, "IMU")];
        let result = segment_attacks(&points, &config);

        assert_eq!(result.segments.len(), 2);
        assert_eq!((result.segments[0].start_index, result.segments[0].end_index), (0, 0));
        assert_eq!(result.segments[0].attack_type, "GPS");
        assert_eq!((result.segments[1].start_index, result.segments[1].end_index), (1, 2));
        assert_eq!(result.segment_of, vec![Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_untyped_opening_adopts_later_type_without_split() {
        let config = SegmentationConfig {
            type_change: TypeChangePolicy::Split,
            ..Default::default()
        };
        let points = vec![clean(0.0, 0.0).attacked(), typed(1.0, 0.0, "GPS")];
        let result = segment_attacks(&points, &config);

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].attack_type, "GPS");
    }

    #[test]
    fn test_none_type_without_flag_is_clean() {
        let points = vec![clean(0.0, 0.0).with_attack_type("None")];
        assert!(!has_attack_data(&points));
        assert!(segment_attacks(&points, &SegmentationConfig::default()).segments.is_empty());
    }

    #[test]
    fn test_affected_parameters_union() {
        let points = vec![
            clean(0.0, 0.0).attacked().with_position_deltas(2.0, 0.0, 0.0),
            clean(1.0, 0.0).attacked().with_position_deltas(0.0, -1.0, 0.0),
            clean(2.0, 0.0).attacked().with_velocity_delta(0.5),
        ];
        let result = segment_attacks(&points, &SegmentationConfig::default());
        let params: Vec<_> = result.segments[0].affected_parameters.iter().copied().collect();

        assert_eq!(
            params,
            vec![
                AttackedParameter::PositionN,
                AttackedParameter::PositionE,
                AttackedParameter::Velocity,
            ]
        );
        assert_eq!(result.segments[0].parameter_list(), "position_n, position_e, velocity");
    }

    #[test]
    fn test_generic_position_without_deltas() {
        let fields = AttackFields {
            is_attacked: Some(true.into()),
            ..Default::default()
        };
        assert_eq!(affected_parameters(&fields), vec![AttackedParameter::Position]);

        // Present-but-zero deltas report nothing
        let zeroed = FlightPoint::new(0.0, 0.0, 0.0, 0.0)
            .attacked()
            .with_position_deltas(0.0, 0.0, 0.0);
        assert!(affected_parameters(&zeroed.attack).is_empty());
    }

    #[test]
    fn test_deviation_from_position_and_velocity() {
        let points = vec![
            clean(0.0, 0.0).attacked().with_position_deltas(1.0, -3.0, 0.5),
            clean(4.0, 0.0).attacked().with_velocity_delta(2.0),
        ];
        let result = segment_attacks(&points, &SegmentationConfig::default());
        let seg = &result.segments[0];

        // |dv| * duration / 2 = 2 * 4 / 2 = 4 beats the 3m position delta
        assert_relative_eq!(seg.max_deviation, 4.0);
        assert_eq!(seg.deviation_source, DeviationSource::Measured);
    }

    #[test]
    fn test_deviation_fallback() {
        let points = vec![typed(10.0, 0.0, "GPS"), typed(16.0, 0.0, "GPS")];
        let result = segment_attacks(&points, &SegmentationConfig::default());
        let seg = &result.segments[0];

        assert_relative_eq!(seg.max_deviation, 3.0);
        assert_eq!(seg.deviation_source, DeviationSource::Heuristic);
    }

    #[test]
    fn test_attack_status_opens_segment() {
        let mut point = clean(0.0, 0.0);
        point.attack.attack_status = Some(crate::point::FieldValue::Number(2.0));
        let result = segment_attacks(&[point], &SegmentationConfig::default());
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn test_segment_lookup_out_of_range() {
        let points = vec![typed(0.0, 0.0, "GPS")];
        let result = segment_attacks(&points, &SegmentationConfig::default());

        assert!(result.segment_at(0).is_some());
        assert!(result.segment_at(1).is_none());
        assert!(result.segment_at(usize::MAX).is_none());
    }

    #[test]
    fn test_summary() {
        let points = vec![
            typed(0.0, 0.0, "GPS"),
            typed(1.0, 0.0, "GPS"),
            clean(2.0, 0.0),
            typed(3.0, 0.0, "IMU").with_position_deltas(7.0, 0.0, 0.0),
        ];
        let result = segment_attacks(&points, &SegmentationConfig::default());
        let summary = AttackSummary::from_segments(&result.segments);

        assert_eq!(summary.segment_count, 2);
        assert_eq!(summary.attacked_points, 3);
        assert_relative_eq!(summary.attacked_duration, 1.0);
        assert_relative_eq!(summary.max_deviation, 7.0);
        assert_eq!(summary.attack_types, vec!["GPS".to_string(), "IMU".to_string()]);
    }

    fn arb_points() -> impl Strategy<Value = Vec<FlightPoint>> {
        prop::collection::vec((0u8..4, prop::option::of(-5.0f64..5.0)), 0..64).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (kind, delta))| {
                    let mut point = clean(i as f64 * 0.1, -10.0);
                    point = match kind {
                        0 => point,
                        1 => point.attacked(),
                        2 => point.with_attack_type("GPS"),
                        _ => point.with_attack_type("IMU"),
                    };
                    point.attack.delta_position_n = delta;
                    point
                })
                .collect()
        })
    }

    fn arb_policy() -> impl Strategy<Value = TypeChangePolicy> {
        prop_oneof![Just(TypeChangePolicy::Overwrite), Just(TypeChangePolicy::Split)]
    }

    proptest! {
        #[test]
        fn prop_segments_ordered_disjoint_and_covering(points in arb_points(), policy in arb_policy()) {
            let config = SegmentationConfig { type_change: policy, ..Default::default() };
            let result = segment_attacks(&points, &config);

            for pair in result.segments.windows(2) {
                prop_assert!(pair[0].end_index < pair[1].start_index);
            }
            for seg in &result.segments {
                prop_assert!(seg.start_index <= seg.end_index);
                prop_assert!(seg.end_index < points.len());
                prop_assert!(seg.duration >= 0.0);
            }
            for (index, point) in points.iter().enumerate() {
                let owners = result.segments.iter().filter(|s| s.contains(index)).count();
                if point.is_attacked() {
                    prop_assert_eq!(owners, 1);
                    prop_assert!(result.segment_at(index).is_some_and(|s| s.contains(index)));
                } else {
                    prop_assert_eq!(owners, 0);
                    prop_assert!(result.segment_at(index).is_none());
                }
            }
        }

        #[test]
        fn prop_segmentation_is_idempotent(points in arb_points()) {
            let config = SegmentationConfig::default();
            prop_assert_eq!(segment_attacks(&points, &config), segment_attacks(&points, &config));
        }
    }
}
