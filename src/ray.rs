//! Rays for camera casting and hit testing.

use crate::error::Result;
use crate::math::normalize_checked;
use glam::Vec3;

/// A ray in 3D space with an origin point and a unit-length direction.
///
/// The direction is normalized on construction. Building a ray from a
/// zero-length direction fails with
/// [`TraceError::ZeroLengthDirection`](crate::TraceError::ZeroLengthDirection)
/// instead of producing NaN components.
///
/// # Example
///
/// ```
/// use slabtrace::Ray;
/// use glam::Vec3;
///
/// let ray = Ray::new(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 0.0, -2.0)).unwrap();
/// assert_eq!(ray.direction(), Vec3::new(0.0, 0.0, -1.0));
/// assert_eq!(ray.point_at(3.0), Vec3::new(0.0, 1.0, 2.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3) -> Result<Self> {
        Ok(Self {
            origin,
            direction: normalize_checked(direction)?,
        })
    }

    /// The starting point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// The unit direction of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Point along the ray at parameter `t`.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        }
    }
}
