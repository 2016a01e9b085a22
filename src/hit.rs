//! Ray/box hit testing against an object's live transform.
//!
//! This module provides:
//!
//! - [`ModelTransform`]: anything that can report its current model matrix
//! - [`HitShape`]: the two box tests, world-aligned [`HitShape::Aabb`] and
//!   oriented [`HitShape::Obb`]
//! - [`Hit`]: a hit tester bound to a transform provider
//! - [`Hittable`]: the one-method capability the ray tracer iterates over
//!
//! A [`Hit`] holds a handle to its provider, never a copy of the matrix, so
//! every test observes the transform the object has *now*.
//!
//! # Example
//!
//! ```
//! use slabtrace::{Hit, HitShape, Hittable};
//! use glam::{Mat4, Vec3};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let transform = Rc::new(RefCell::new(Mat4::IDENTITY));
//! let hit = Hit::new(transform.clone(), HitShape::Obb);
//!
//! let origin = Vec3::new(0.0, 0.0, -5.0);
//! assert!(hit.check_hit(origin, Vec3::Z).unwrap());
//!
//! // Move the box out of the way; the same Hit sees the new matrix.
//! *transform.borrow_mut() = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
//! assert!(!hit.check_hit(origin, Vec3::Z).unwrap());
//! ```

use crate::error::Result;
use crate::math::{inverse_checked, matrix_position, matrix_scale, normalize_checked};
use glam::{Mat4, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

/// Capability to report an object's model matrix at the time of the call.
pub trait ModelTransform {
    fn current_transform(&self) -> Mat4;
}

impl ModelTransform for Mat4 {
    fn current_transform(&self) -> Mat4 {
        *self
    }
}

impl<T: ModelTransform + ?Sized> ModelTransform for &T {
    fn current_transform(&self) -> Mat4 {
        (**self).current_transform()
    }
}

impl<T: ModelTransform + ?Sized> ModelTransform for Rc<RefCell<T>> {
    fn current_transform(&self) -> Mat4 {
        self.borrow().current_transform()
    }
}

/// Which box a [`Hit`] tests against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitShape {
    /// World-aligned box `position ± scale`. Rotation is ignored, so a
    /// rotated object is approximated by the box of its unrotated extents.
    Aabb,
    /// Unit cube `[-1, 1]³` in object space; the ray is moved into local
    /// space through the inverse model matrix.
    #[default]
    Obb,
}

/// Capability to answer whether a ray hits an object.
pub trait Hittable {
    /// `direction` need not be normalized but must have non-zero length.
    fn check_hit(&self, origin: Vec3, direction: Vec3) -> Result<bool>;
}

impl<T: Hittable + ?Sized> Hittable for &T {
    fn check_hit(&self, origin: Vec3, direction: Vec3) -> Result<bool> {
        (**self).check_hit(origin, direction)
    }
}

impl<T: Hittable + ?Sized> Hittable for Box<T> {
    fn check_hit(&self, origin: Vec3, direction: Vec3) -> Result<bool> {
        (**self).check_hit(origin, direction)
    }
}

/// A box hit tester bound to a transform provider.
#[derive(Clone, Debug)]
pub struct Hit<P> {
    provider: P,
    shape: HitShape,
    hittable: bool,
}

impl<P: ModelTransform> Hit<P> {
    pub fn new(provider: P, shape: HitShape) -> Self {
        Self {
            provider,
            shape,
            hittable: true,
        }
    }

    pub fn aabb(provider: P) -> Self {
        Self::new(provider, HitShape::Aabb)
    }

    pub fn obb(provider: P) -> Self {
        Self::new(provider, HitShape::Obb)
    }

    /// Builder form of [`set_hittable`](Self::set_hittable).
    pub fn hittable(mut self, hittable: bool) -> Self {
        self.hittable = hittable;
        self
    }

    pub fn set_hittable(&mut self, hittable: bool) {
        self.hittable = hittable;
    }

    pub fn is_hittable(&self) -> bool {
        self.hittable
    }

    pub fn shape(&self) -> HitShape {
        self.shape
    }

    /// The provider's model matrix, fetched on every call.
    pub fn model_matrix(&self) -> Mat4 {
        self.provider.current_transform()
    }

    pub fn position(&self) -> Vec3 {
        matrix_position(&self.model_matrix())
    }

    pub fn scale(&self) -> Vec3 {
        matrix_scale(&self.model_matrix())
    }

    /// World-space `(min, max)` of the [`HitShape::Aabb`] test box.
    pub fn aabb_bounds(&self) -> (Vec3, Vec3) {
        let m = self.model_matrix();
        let position = matrix_position(&m);
        let scale = matrix_scale(&m);
        (position - scale, position + scale)
    }
}

impl<P: ModelTransform> Hittable for Hit<P> {
    fn check_hit(&self, origin: Vec3, direction: Vec3) -> Result<bool> {
        if !self.hittable {
            return Ok(false);
        }

        let direction = normalize_checked(direction)?;

        match self.shape {
            HitShape::Aabb => {
                let (min, max) = self.aabb_bounds();
                Ok(slab_test(origin, direction, min, max))
            }
            HitShape::Obb => {
                let inverse = inverse_checked(self.model_matrix())?;
                let local_origin = (inverse * origin.extend(1.0)).truncate();
                let local_dir = normalize_checked((inverse * direction.extend(0.0)).truncate())?;
                Ok(slab_test(local_origin, local_dir, Vec3::NEG_ONE, Vec3::ONE))
            }
        }
    }
}

/// Slab-method ray/box test.
///
/// Per axis, `t = (bound - origin) / direction` gives the entry and exit
/// distances; the ray hits when the latest entry is no later than the
/// earliest exit and the exit is not behind the origin.
///
/// An axis with a zero direction component is handled explicitly: it
/// constrains nothing when the origin lies within `[min, max]` on that axis
/// (boundaries included) and rules out a hit otherwise.
pub fn slab_test(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> bool {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];

        if d == 0.0 {
            if o < min[axis] || o > max[axis] {
                return false;
            }
            continue;
        }

        let t_min = (min[axis] - o) / d;
        let t_max = (max[axis] - o) / d;
        t_near = t_near.max(t_min.min(t_max));
        t_far = t_far.min(t_min.max(t_max));
    }

    t_near <= t_far && t_far >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::math::model_matrix;

    #[test]
    fn obb_at_origin_is_hit_along_z() {
        let hit = Hit::obb(Mat4::IDENTITY);
        assert!(hit.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z).unwrap());
    }

    #[test]
    fn obb_misses_parallel_rays_outside_unit_cube() {
        let hit = Hit::obb(Mat4::IDENTITY);
        for offset in [
            Vec3::new(1.5, 0.0, 0.0),
            Vec3::new(-1.5, 0.0, 0.0),
            Vec3::new(0.0, 1.01, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
        ] {
            let origin = Vec3::new(0.0, 0.0, -5.0) + offset;
            assert!(!hit.check_hit(origin, Vec3::Z).unwrap(), "offset {offset}");
        }
    }

    #[test]
    fn box_behind_origin_is_not_hit() {
        let hit = Hit::obb(Mat4::IDENTITY);
        assert!(!hit.check_hit(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).unwrap());
        let hit = Hit::aabb(Mat4::IDENTITY);
        assert!(!hit.check_hit(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).unwrap());
    }

    #[test]
    fn origin_inside_box_hits() {
        let hit = Hit::aabb(Mat4::IDENTITY);
        assert!(hit.check_hit(Vec3::ZERO, Vec3::new(0.3, -0.2, 0.9)).unwrap());
    }

    #[test]
    fn unhittable_never_hits_and_skips_geometry() {
        for shape in [HitShape::Aabb, HitShape::Obb] {
            let hit = Hit::new(Mat4::IDENTITY, shape).hittable(false);
            assert!(!hit.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z).unwrap());
            // A zero direction would be an error if geometry were evaluated.
            assert_eq!(hit.check_hit(Vec3::ZERO, Vec3::ZERO), Ok(false));
            // Same for a singular transform.
            let singular = Hit::new(Mat4::ZERO, shape).hittable(false);
            assert_eq!(singular.check_hit(Vec3::ZERO, Vec3::Z), Ok(false));
        }
    }

    #[test]
    fn zero_direction_is_an_error() {
        let hit = Hit::aabb(Mat4::IDENTITY);
        assert_eq!(
            hit.check_hit(Vec3::ZERO, Vec3::ZERO),
            Err(TraceError::ZeroLengthDirection)
        );
    }

    #[test]
    fn obb_with_singular_transform_is_an_error() {
        let hit = Hit::obb(Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(
            hit.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z),
            Err(TraceError::SingularTransform)
        );
    }

    #[test]
    fn axis_parallel_rays_do_not_crash() {
        let hit = Hit::aabb(Mat4::IDENTITY);
        // x and y direction components are exactly zero.
        assert!(hit.check_hit(Vec3::new(0.5, -0.5, -3.0), Vec3::Z).unwrap());
        assert!(!hit.check_hit(Vec3::new(3.0, 0.0, -3.0), Vec3::Z).unwrap());
        // Negative zero behaves like zero.
        assert!(hit.check_hit(Vec3::new(0.0, 0.0, -3.0), Vec3::new(-0.0, -0.0, 1.0)).unwrap());
    }

    #[test]
    fn aabb_uses_position_and_column_lengths() {
        let m = model_matrix(Vec3::new(4.0, 0.0, 0.0), Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let hit = Hit::aabb(m);
        assert_eq!(hit.position(), Vec3::new(4.0, 0.0, 0.0));
        assert!((hit.scale() - Vec3::new(2.0, 1.0, 1.0)).length() < 1e-6);

        let (min, max) = hit.aabb_bounds();
        assert!((min - Vec3::new(2.0, -1.0, -1.0)).length() < 1e-6);
        assert!((max - Vec3::new(6.0, 1.0, 1.0)).length() < 1e-6);

        let origin = Vec3::new(5.9, 0.0, -10.0);
        assert!(hit.check_hit(origin, Vec3::Z).unwrap());
        assert!(!hit.check_hit(Vec3::new(6.1, 0.0, -10.0), Vec3::Z).unwrap());
    }

    #[test]
    fn aabb_ignores_rotation_while_obb_follows_it() {
        // A thin slab rotated 90° about Y: locally 2 x 0.2 x 0.2, after rotation
        // its long axis points along world Z.
        let m = model_matrix(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0), Vec3::new(1.0, 0.1, 0.1));
        let from_side = Vec3::new(-5.0, 0.0, 0.8);

        // The OBB extends along world Z to ±1, so this side ray hits it.
        assert!(Hit::obb(m).check_hit(from_side, Vec3::X).unwrap());
        // The AABB keeps the unrotated extents: z only spans ±0.1.
        assert!(!Hit::aabb(m).check_hit(from_side, Vec3::X).unwrap());
    }

    #[test]
    fn hit_observes_current_transform() {
        struct Mover {
            x: f32,
        }
        impl ModelTransform for Mover {
            fn current_transform(&self) -> Mat4 {
                Mat4::from_translation(Vec3::new(self.x, 0.0, 0.0))
            }
        }

        let mover = Rc::new(RefCell::new(Mover { x: 0.0 }));
        let hit = Hit::aabb(mover.clone());
        let origin = Vec3::new(0.0, 0.0, -5.0);
        assert!(hit.check_hit(origin, Vec3::Z).unwrap());

        mover.borrow_mut().x = 5.0;
        assert!(!hit.check_hit(origin, Vec3::Z).unwrap());
        assert_eq!(hit.position(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn slab_test_grazing_boundary_counts_as_inside() {
        // Origin exactly on the x = 1 face, moving along z.
        assert!(slab_test(Vec3::new(1.0, 0.0, -4.0), Vec3::Z, Vec3::NEG_ONE, Vec3::ONE));
    }
}
