//! Aircraft pose updates
//!
//! The aircraft model's nose points along render +Z and its canopy along
//! render +Y. With explicit attitude the model is turned by yaw about +Y,
//! then pitch about its lateral axis (nose up positive), then roll about its
//! nose. Without attitude it looks from the current render point toward the
//! next one.

use crate::trajectory::Trajectory;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Shortest direction that still counts as travel.
const MIN_TRAVEL: f64 = 1e-9;

/// Position and orientation of one aircraft model in render space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for AircraftPose {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl AircraftPose {
    /// Unit vector along the nose.
    pub fn forward(&self) -> Vector3<f64> {
        self.orientation * Vector3::z()
    }

    /// (roll, pitch, yaw) in radians, inverse of [`attitude_to_orientation`].
    pub fn attitude(&self) -> (f64, f64, f64) {
        // Rotation is Ry(yaw) * Rx(-pitch) * Rz(roll); read the angles back
        // from the rotated basis.
        let m = self.orientation.to_rotation_matrix();
        let m = m.matrix();
        let lateral = (-m[(1, 2)]).clamp(-1.0, 1.0).asin();
        let yaw = m[(0, 2)].atan2(m[(2, 2)]);
        let roll = m[(1, 0)].atan2(m[(1, 1)]);
        (roll, -lateral, yaw)
    }
}

/// Orientation for explicit roll/pitch/yaw (radians).
pub fn attitude_to_orientation(roll: f64, pitch: f64, yaw: f64) -> UnitQuaternion<f64> {
    let yaw_q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw);
    let pitch_q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -pitch);
    let roll_q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), roll);
    yaw_q * pitch_q * roll_q
}

/// Orientation whose nose faces along `direction`. `None` for a zero vector.
pub fn look_along(direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    if direction.norm() < MIN_TRAVEL {
        return None;
    }

    let dir = direction.normalize();
    // Straight up or down: +Y cannot serve as the reference up
    let up = if dir.cross(&Vector3::y()).norm() < 1e-6 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    Some(UnitQuaternion::face_towards(&dir, &up))
}

/// Moves `pose` to point `time_index` of `trajectory`.
///
/// Returns `false` (and leaves the pose alone) when the index is past the
/// trajectory's end. Orientation is left unchanged on the last point when
/// there is no explicit attitude to apply.
pub fn update_pose(pose: &mut AircraftPose, trajectory: &Trajectory, time_index: usize) -> bool {
    let render = trajectory.render_points();
    let Some(position) = render.get(time_index) else {
        return false;
    };
    pose.position = *position;

    let point = &trajectory.points()[time_index];
    if let Some((roll, pitch, yaw)) = point.attitude() {
        pose.orientation = attitude_to_orientation(roll, pitch, yaw);
    } else if let Some(next) = render.get(time_index + 1) {
        if let Some(orientation) = look_along(&(next - position)) {
            pose.orientation = orientation;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FlightPoint;
    use crate::segmentation::SegmentationConfig;
    use crate::trajectory::Rgb;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn build(points: Vec<FlightPoint>) -> Trajectory {
        Trajectory::build(points, "t", Rgb::palette(0), &SegmentationConfig::default()).unwrap()
    }

    #[test]
    fn test_position_follows_render_point() {
        let t = build(vec![
            FlightPoint::new(0.0, 0.0, 0.0, -10.0),
            FlightPoint::new(1.0, 5.0, 0.0, -10.0),
        ]);
        let mut pose = AircraftPose::default();

        assert!(update_pose(&mut pose, &t, 1));
        assert_eq!(pose.position, t.render_points()[1]);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let t = build(vec![FlightPoint::new(0.0, 1.0, 2.0, -3.0)]);
        let mut pose = AircraftPose::default();

        assert!(!update_pose(&mut pose, &t, 1));
        assert_eq!(pose, AircraftPose::default());
    }

    #[test]
    fn test_look_at_next_point() {
        // Flying due east: render +X
        let t = build(vec![
            FlightPoint::new(0.0, 0.0, 0.0, -10.0),
            FlightPoint::new(1.0, 0.0, 10.0, -10.0),
        ]);
        let mut pose = AircraftPose::default();
        update_pose(&mut pose, &t, 0);

        let fwd = pose.forward();
        assert_relative_eq!(fwd.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fwd.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(fwd.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_last_point_holds_orientation() {
        let t = build(vec![
            FlightPoint::new(0.0, 0.0, 0.0, -10.0),
            FlightPoint::new(1.0, 0.0, 10.0, -10.0),
        ]);
        let mut pose = AircraftPose::default();
        update_pose(&mut pose, &t, 0);
        let heading = pose.orientation;

        assert!(update_pose(&mut pose, &t, 1));
        assert_eq!(pose.orientation, heading);
        assert_eq!(pose.position, t.render_points()[1]);
    }

    #[test]
    fn test_explicit_attitude_wins() {
        // Heading east by yaw while the track runs north
        let t = build(vec![
            FlightPoint::new(0.0, 0.0, 0.0, -10.0).with_attitude(0.0, 0.0, FRAC_PI_2),
            FlightPoint::new(1.0, 10.0, 0.0, -10.0),
        ]);
        let mut pose = AircraftPose::default();
        update_pose(&mut pose, &t, 0);

        let fwd = pose.forward();
        assert_relative_eq!(fwd.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fwd.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pitch_raises_nose() {
        let q = attitude_to_orientation(0.0, 0.3, 0.0);
        let fwd = q * Vector3::z();
        assert!(fwd.y > 0.0);
        assert_relative_eq!(fwd.y, 0.3f64.sin(), epsilon = 1e-9);
    }

    #[test]
    fn test_attitude_readback() {
        let pose = AircraftPose {
            position: Vector3::zeros(),
            orientation: attitude_to_orientation(0.2, -0.1, 1.0),
        };
        let (roll, pitch, yaw) = pose.attitude();

        assert_relative_eq!(roll, 0.2, epsilon = 1e-9);
        assert_relative_eq!(pitch, -0.1, epsilon = 1e-9);
        assert_relative_eq!(yaw, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_and_stationary_travel() {
        assert!(look_along(&Vector3::zeros()).is_none());

        let climb = look_along(&Vector3::new(0.0, 5.0, 0.0)).unwrap();
        let fwd = climb * Vector3::z();
        assert_relative_eq!(fwd.y, 1.0, epsilon = 1e-9);
    }
}
