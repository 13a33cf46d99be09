// Axis-angle rotation vectors to unit quaternions

use crate::types::{Double3, Quaternion};
use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Below this magnitude a rotation vector is treated as no rotation at all.
pub const MIN_ROTATION_ANGLE: f64 = 1e-16;

/// Convert an axis-angle rotation vector (direction = axis, norm = angle in
/// radians) into a unit quaternion.
///
/// A vector shorter than [`MIN_ROTATION_ANGLE`] has no usable axis, so the
/// identity is returned instead of normalizing it.
pub fn rotation_vector_to_quaternion(rotation: &Double3) -> Quaternion {
    let vector = Vector3::new(rotation.x, rotation.y, rotation.z);
    let angle = vector.norm();

    if angle < MIN_ROTATION_ANGLE {
        return Quaternion::identity();
    }

    let axis = Unit::new_unchecked(vector / angle);
    let q = UnitQuaternion::from_axis_angle(&axis, angle);

    Quaternion {
        x: q.i,
        y: q.j,
        z: q.k,
        w: q.w,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_quat_eq(actual: Quaternion, expected: [f64; 4]) {
        let values = [actual.x, actual.y, actual.z, actual.w];
        for (a, e) in values.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "got {:?}, expected {:?}", values, expected);
        }
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let q = rotation_vector_to_quaternion(&Double3::new(0.0, 0.0, 0.0));
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_tiny_rotation_is_identity() {
        let q = rotation_vector_to_quaternion(&Double3::new(1e-17, -1e-17, 5e-18));
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_half_turn_about_z() {
        let q = rotation_vector_to_quaternion(&Double3::new(0.0, 0.0, PI));
        assert_quat_eq(q, [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let q = rotation_vector_to_quaternion(&Double3::new(0.0, 0.0, FRAC_PI_2));
        let h = (FRAC_PI_2 / 2.0).sin();
        assert_quat_eq(q, [0.0, 0.0, h, (FRAC_PI_2 / 2.0).cos()]);
    }

    #[test]
    fn test_negative_angle_about_x() {
        let q = rotation_vector_to_quaternion(&Double3::new(-FRAC_PI_2, 0.0, 0.0));
        let h = (FRAC_PI_2 / 2.0).sin();
        assert_quat_eq(q, [-h, 0.0, 0.0, (FRAC_PI_2 / 2.0).cos()]);
    }

    #[test]
    fn test_result_is_unit_length() {
        let q = rotation_vector_to_quaternion(&Double3::new(0.3, -1.2, 2.5));
        let norm = (q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w).sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
