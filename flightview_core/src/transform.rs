//! NED → render-space coordinate transform
//!
//! Flight logs use North-East-Down. The render space is Y-up with
//! `x = east`, `y = up`, `z = north`. Vertical motion is exaggerated by
//! [`ALTITUDE_SCALE`] on the render Y axis only; raw altitude stays available
//! through [`altitude`] for charts and the inspector.

use crate::point::FlightPoint;
use nalgebra::Vector3;

/// Vertical exaggeration applied to render-space Y.
pub const ALTITUDE_SCALE: f64 = 1.8;

/// Maps a point to render space.
pub fn transform(point: &FlightPoint) -> Vector3<f64> {
    ned_to_render(point.position_n, point.position_e, point.position_d)
}

/// Maps raw NED components to render space.
pub fn ned_to_render(n: f64, e: f64, d: f64) -> Vector3<f64> {
    Vector3::new(e, -d * ALTITUDE_SCALE, n)
}

/// Inverse of [`ned_to_render`]: returns `(n, e, d)`.
pub fn render_to_ned(render: &Vector3<f64>) -> (f64, f64, f64) {
    (render.z, render.x, -render.y / ALTITUDE_SCALE)
}

/// Raw altitude in meters (unscaled).
pub fn altitude(point: &FlightPoint) -> f64 {
    point.altitude()
}

/// Straight-line distance between two points in meters, without the
/// vertical exaggeration.
pub fn unscaled_distance(a: &FlightPoint, b: &FlightPoint) -> f64 {
    let dn = b.position_n - a.position_n;
    let de = b.position_e - a.position_e;
    let dd = b.position_d - a.position_d;
    (dn * dn + de * de + dd * dd).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_mapping() {
        let point = FlightPoint::new(0.0, 10.0, 20.0, -30.0);
        let v = transform(&point);

        assert_relative_eq!(v.x, 20.0);
        assert_relative_eq!(v.y, 30.0 * ALTITUDE_SCALE);
        assert_relative_eq!(v.z, 10.0);

        // Scale never leaks into the raw altitude
        assert_relative_eq!(altitude(&point), 30.0);
    }

    #[test]
    fn test_round_trip_through_render_space() {
        let v = ned_to_render(-4.0, 7.5, -12.25);
        let (n, e, d) = render_to_ned(&v);

        assert_relative_eq!(n, -4.0, epsilon = 1e-12);
        assert_relative_eq!(e, 7.5, epsilon = 1e-12);
        assert_relative_eq!(d, -12.25, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let point = FlightPoint::new(3.0, 1.0, 2.0, -3.0).attacked();
        assert_eq!(transform(&point), transform(&point));
    }

    #[test]
    fn test_unscaled_distance() {
        let a = FlightPoint::new(0.0, 0.0, 0.0, 0.0);
        let b = FlightPoint::new(1.0, 3.0, 0.0, -4.0);
        assert_relative_eq!(unscaled_distance(&a, &b), 5.0);
    }
}
