//! Small linear-algebra helpers on top of `glam`.
//!
//! Model matrices are always composed in the same order:
//! `translate · rotate_x · rotate_y · rotate_z · scale`, with Euler angles given
//! in degrees and wrapped into `[0, 360)` before conversion.

use crate::error::{Result, TraceError};
use glam::{Mat4, Vec3};

/// Wraps an angle in degrees into `[0, 360)`.
///
/// Negative angles wrap upwards, so `-90.0` becomes `270.0`.
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    angle.rem_euclid(360.0)
}

/// Builds a model matrix from a position, Euler rotation (degrees) and scale.
///
/// # Example
///
/// ```
/// use slabtrace::math::model_matrix;
/// use glam::Vec3;
///
/// let m = model_matrix(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::ONE);
/// assert_eq!(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
/// ```
pub fn model_matrix(position: Vec3, rotation_degrees: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_rotation_x(wrap_degrees(rotation_degrees.x).to_radians())
        * Mat4::from_rotation_y(wrap_degrees(rotation_degrees.y).to_radians())
        * Mat4::from_rotation_z(wrap_degrees(rotation_degrees.z).to_radians())
        * Mat4::from_scale(scale)
}

/// Normalizes `v`, failing instead of producing NaN when it has no length.
pub fn normalize_checked(v: Vec3) -> Result<Vec3> {
    v.try_normalize().ok_or(TraceError::ZeroLengthDirection)
}

/// Inverts `m`, failing when the matrix is singular.
pub fn inverse_checked(m: Mat4) -> Result<Mat4> {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(TraceError::SingularTransform);
    }
    Ok(m.inverse())
}

/// Translation stored in column 3 of a model matrix.
#[inline]
pub fn matrix_position(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Per-axis scale: the length of basis columns 0, 1 and 2.
#[inline]
pub fn matrix_scale(m: &Mat4) -> Vec3 {
    Vec3::new(
        m.x_axis.truncate().length(),
        m.y_axis.truncate().length(),
        m.z_axis.truncate().length(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn wrap_degrees_handles_negative_and_large_angles() {
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
    }

    #[test]
    fn model_matrix_extracts_position_and_scale() {
        let m = model_matrix(
            Vec3::new(-2.0, 0.5, 4.0),
            Vec3::new(30.0, 45.0, 60.0),
            Vec3::new(1.0, 2.0, 3.0),
        );
        assert!(approx(matrix_position(&m), Vec3::new(-2.0, 0.5, 4.0)));
        assert!(approx(matrix_scale(&m), Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        let r = Vec3::new(90.0, 90.0, 0.0);
        let m = model_matrix(Vec3::ZERO, r, Vec3::ONE);
        let expected = Mat4::from_rotation_x(90f32.to_radians())
            * Mat4::from_rotation_y(90f32.to_radians());
        let p = Vec3::new(1.0, 0.0, 0.0);
        assert!(approx(m.transform_point3(p), expected.transform_point3(p)));

        // Swapping the order gives a different result for this point.
        let swapped = Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_rotation_x(90f32.to_radians());
        assert!(!approx(m.transform_point3(p), swapped.transform_point3(p)));
    }

    #[test]
    fn angles_are_taken_modulo_360() {
        let a = model_matrix(Vec3::ZERO, Vec3::new(370.0, -10.0, 0.0), Vec3::ONE);
        let b = model_matrix(Vec3::ZERO, Vec3::new(10.0, 350.0, 0.0), Vec3::ONE);
        assert!(a.abs_diff_eq(b, 1e-5));
    }

    #[test]
    fn normalize_checked_rejects_zero() {
        assert_eq!(normalize_checked(Vec3::ZERO), Err(TraceError::ZeroLengthDirection));
        let n = normalize_checked(Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_checked_rejects_zero_scale() {
        let m = model_matrix(Vec3::ZERO, Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(inverse_checked(m), Err(TraceError::SingularTransform));
        let ok = model_matrix(Vec3::X, Vec3::ZERO, Vec3::splat(2.0));
        assert!((inverse_checked(ok).unwrap() * ok).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
